//! This module provides the [`Blob`] struct, a wrapper around [`Vec<u8>`] used for tile content.
//!
//! # Examples
//!
//! ```rust
//! use tilecache_core::Blob;
//!
//! let blob = Blob::from(vec![0, 1, 2, 3]);
//! assert_eq!(blob.len(), 4);
//! assert_eq!(blob.as_slice(), &[0, 1, 2, 3]);
//!
//! let text = Blob::from("Xylofön");
//! assert_eq!(text.as_str(), Some("Xylofön"));
//! ```

use std::fmt::Debug;

/// Raw tile bytes as they were received from the network or read from disk.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Blob(Vec<u8>);

impl Blob {
	/// Creates an empty `Blob`.
	#[must_use]
	pub fn new_empty() -> Blob {
		Blob(Vec::new())
	}

	#[must_use]
	pub fn as_slice(&self) -> &[u8] {
		self.0.as_ref()
	}

	#[must_use]
	pub fn into_vec(self) -> Vec<u8> {
		self.0
	}

	/// Returns the content as text, or `None` if it is not valid UTF-8.
	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		std::str::from_utf8(&self.0).ok()
	}

	/// Length in bytes. This is the amount a stored tile adds to the cache usage.
	#[must_use]
	pub fn len(&self) -> u64 {
		self.0.len() as u64
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl From<Vec<u8>> for Blob {
	fn from(item: Vec<u8>) -> Self {
		Blob(item)
	}
}

impl From<&[u8]> for Blob {
	fn from(item: &[u8]) -> Self {
		Blob(item.to_vec())
	}
}

impl<const N: usize> From<&[u8; N]> for Blob {
	fn from(item: &[u8; N]) -> Self {
		Blob(item.to_vec())
	}
}

impl From<&str> for Blob {
	fn from(item: &str) -> Self {
		Blob(item.as_bytes().to_vec())
	}
}

impl AsRef<[u8]> for Blob {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

/// Prints the length and, for short text content, the content itself.
impl Debug for Blob {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.as_str() {
			Some(text) if text.len() <= 32 => write!(f, "Blob({}): {text:?}", self.0.len()),
			_ => write!(f, "Blob({})", self.0.len()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn conversions() {
		let vec = vec![0u8, 1, 2, 3, 4];
		assert_eq!(Blob::from(vec.clone()).into_vec(), vec);
		assert_eq!(Blob::from(vec.as_slice()).as_slice(), vec.as_slice());
		assert_eq!(Blob::from(&[9u8, 8]).as_slice(), &[9, 8]);
		assert_eq!(Blob::from("abc").as_ref(), b"abc");
	}

	#[test]
	fn empty_and_len() {
		let blob = Blob::new_empty();
		assert!(blob.is_empty());
		assert_eq!(blob.len(), 0);
		assert_eq!(Blob::from("hello").len(), 5);
	}

	#[test]
	fn as_str_rejects_invalid_utf8() {
		assert_eq!(Blob::from(&[0xffu8, 0xfe]).as_str(), None);
	}

	#[test]
	fn debug_format() {
		assert_eq!(format!("{:?}", Blob::from("png")), "Blob(3): \"png\"");
		assert_eq!(format!("{:?}", Blob::from(vec![0xffu8; 40])), "Blob(40)");
	}
}
