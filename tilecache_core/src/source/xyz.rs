//! A tile source for the common `{z}/{x}/{y}` URL layout.
//!
//! # Examples
//!
//! ```
//! use tilecache_core::{TileKey, source::{TileSource, XyzTileSource}};
//!
//! let source = XyzTileSource::new("osm", &["https://tile.example.org/"], ".png").unwrap();
//! let key = TileKey::new("osm", 3, 1, 2).unwrap();
//! assert_eq!(source.url_for(&key).unwrap(), "https://tile.example.org/3/1/2.png");
//! assert_eq!(source.relative_path_for(&key).to_str().unwrap(), "osm/3/1/2.png");
//! ```

use super::TileSource;
use crate::{Blob, DecodeError, TileKey};
use anyhow::{Result, ensure};
use image::{DynamicImage, ImageError, ImageReader, Limits};
use std::{io::Cursor, path::PathBuf};

/// Tiles served below one or more base URLs as `<base><z>/<x>/<y><suffix>`.
///
/// With several base URLs (mirrors like `a.tile…`, `b.tile…`) a tile always maps to the
/// same mirror, chosen by its position, so the URL of a key never changes.
#[derive(Clone, Debug)]
pub struct XyzTileSource {
	name: String,
	base_urls: Vec<String>,
	suffix: String,
	min_level: u8,
	max_level: u8,
	max_decode_bytes: Option<u64>,
}

impl XyzTileSource {
	pub fn new(name: &str, base_urls: &[&str], suffix: &str) -> Result<XyzTileSource> {
		ensure!(!base_urls.is_empty(), "tile source '{name}' needs at least one base URL");
		ensure!(
			suffix.is_empty() || suffix.starts_with('.'),
			"suffix '{suffix}' must start with '.'"
		);
		Ok(XyzTileSource {
			name: name.to_owned(),
			base_urls: base_urls
				.iter()
				.map(|url| {
					if url.ends_with('/') {
						(*url).to_owned()
					} else {
						format!("{url}/")
					}
				})
				.collect(),
			suffix: suffix.to_owned(),
			min_level: 0,
			max_level: 31,
			max_decode_bytes: None,
		})
	}

	/// Restricts the zoom levels for which the source provides URLs.
	pub fn with_levels(mut self, min_level: u8, max_level: u8) -> Result<XyzTileSource> {
		ensure!(min_level <= max_level, "min_level ({min_level}) must be <= max_level ({max_level})");
		self.min_level = min_level;
		self.max_level = max_level;
		Ok(self)
	}

	/// Caps the memory a single decode may allocate.
	#[must_use]
	pub fn with_max_decode_bytes(mut self, max_decode_bytes: u64) -> XyzTileSource {
		self.max_decode_bytes = Some(max_decode_bytes);
		self
	}

	fn base_url_for(&self, key: &TileKey) -> &str {
		let index = (u64::from(key.x) + u64::from(key.y)) % self.base_urls.len() as u64;
		&self.base_urls[index as usize]
	}
}

impl TileSource for XyzTileSource {
	type Image = DynamicImage;

	fn name(&self) -> &str {
		&self.name
	}

	fn url_for(&self, key: &TileKey) -> Option<String> {
		if key.level < self.min_level || key.level > self.max_level {
			return None;
		}
		Some(format!(
			"{}{}/{}/{}{}",
			self.base_url_for(key),
			key.level,
			key.x,
			key.y,
			self.suffix
		))
	}

	fn relative_path_for(&self, key: &TileKey) -> PathBuf {
		PathBuf::from(&key.layer)
			.join(key.level.to_string())
			.join(key.x.to_string())
			.join(format!("{}{}", key.y, self.suffix))
	}

	fn decode(&self, content: &Blob) -> Result<DynamicImage, DecodeError> {
		let mut reader = ImageReader::new(Cursor::new(content.as_slice()))
			.with_guessed_format()
			.map_err(|e| DecodeError::Corrupt(e.to_string()))?;
		if let Some(max_alloc) = self.max_decode_bytes {
			let mut limits = Limits::default();
			limits.max_alloc = Some(max_alloc);
			reader.limits(limits);
		}
		reader.decode().map_err(|e| match e {
			ImageError::Limits(e) => DecodeError::InsufficientMemory(e.to_string()),
			e => DecodeError::Corrupt(e.to_string()),
		})
	}
}
