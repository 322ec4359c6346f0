//! Tile keys: a zoom level, column and row inside a named tile layer.
//!
//! A [`TileKey`] is what a caller hands to the cache. The layer name keeps tiles of
//! different sources apart on disk, the coordinate selects a tile inside the
//! Web Mercator pyramid.
//!
//! # Examples
//!
//! ```
//! use tilecache_core::TileKey;
//!
//! let key = TileKey::new("osm", 5, 6, 7).unwrap();
//! assert_eq!(key.level, 5);
//! assert_eq!(key.x, 6);
//! assert_eq!(key.y, 7);
//! assert_eq!(key.to_string(), "osm/5/6/7");
//! ```

use anyhow::{Result, ensure};
use std::fmt::{self, Debug, Display};

/// Identifies one tile: zoom level, column and row, plus the layer it belongs to.
#[derive(Eq, PartialEq, Clone, Hash)]
pub struct TileKey {
	/// Name of the tile layer/source.
	pub layer: String,
	/// The zoom level of the tile.
	pub level: u8,
	/// The column (x index) of the tile.
	pub x: u32,
	/// The row (y index) of the tile.
	pub y: u32,
}

impl TileKey {
	/// Create a new `TileKey` for `layer` at zoom `level` and tile indices `x`, `y`.
	///
	/// # Errors
	/// Returns an error if the layer name is empty or could escape the cache
	/// directory, if `level` > 31, or if `x`/`y` are outside the level's grid.
	pub fn new(layer: &str, level: u8, x: u32, y: u32) -> Result<TileKey> {
		ensure!(!layer.is_empty(), "layer name must not be empty");
		ensure!(
			layer
				.bytes()
				.all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.'),
			"layer name '{layer}' may only contain ASCII letters, digits, '_', '-' and '.'"
		);
		ensure!(layer != "." && layer != "..", "layer name '{layer}' is reserved");
		ensure!(level <= 31, "level ({level}) must be <= 31");
		let max = 2u64.pow(u32::from(level));
		ensure!(u64::from(x) < max, "x ({x}) out of bounds for level {level}");
		ensure!(u64::from(y) < max, "y ({y}) out of bounds for level {level}");
		Ok(TileKey {
			layer: layer.to_owned(),
			level,
			x,
			y,
		})
	}

	/// The largest valid x or y index at this key's level.
	#[must_use]
	pub fn max_value(&self) -> u32 {
		(2u64.pow(u32::from(self.level)) - 1) as u32
	}
}

/// `layer/level/x/y`, the same shape as the default relative storage path.
impl Display for TileKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}/{}/{}", self.layer, self.level, self.x, self.y)
	}
}

/// Custom `Debug` format as `TileKey(layer, z, [x, y])` for readability.
impl Debug for TileKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_fmt(format_args!(
			"TileKey({}, {}, [{}, {}])",
			&self.layer, &self.level, &self.x, &self.y
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn new_and_fields() {
		let key = TileKey::new("osm", 5, 3, 4).unwrap();
		assert_eq!(key.layer, "osm");
		assert_eq!(key.level, 5);
		assert_eq!(key.x, 3);
		assert_eq!(key.y, 4);
		assert_eq!(key.max_value(), 31);
	}

	#[test]
	fn partial_eq() {
		let k = TileKey::new("a", 2, 2, 2).unwrap();
		assert_eq!(k, k.clone());
		assert_ne!(k, TileKey::new("b", 2, 2, 2).unwrap());
		assert_ne!(k, TileKey::new("a", 3, 2, 2).unwrap());
		assert_ne!(k, TileKey::new("a", 2, 3, 2).unwrap());
		assert_ne!(k, TileKey::new("a", 2, 2, 3).unwrap());
	}

	#[rstest]
	#[case("", 0, 0, 0)]
	#[case("..", 0, 0, 0)]
	#[case("a/b", 0, 0, 0)]
	#[case("a b", 0, 0, 0)]
	#[case("osm", 32, 0, 0)]
	#[case("osm", 2, 4, 0)]
	#[case("osm", 2, 0, 4)]
	fn new_rejects_invalid(#[case] layer: &str, #[case] level: u8, #[case] x: u32, #[case] y: u32) {
		assert!(TileKey::new(layer, level, x, y).is_err());
	}

	#[test]
	fn level_31_is_accepted() {
		let key = TileKey::new("osm", 31, u32::MAX >> 1, 0).unwrap();
		assert_eq!(key.max_value(), (1u32 << 31) - 1);
	}

	#[test]
	fn display_and_debug() {
		let key = TileKey::new("mapquest-osm", 4, 7, 8).unwrap();
		assert_eq!(key.to_string(), "mapquest-osm/4/7/8");
		assert_eq!(format!("{key:?}"), "TileKey(mapquest-osm, 4, [7, 8])");
	}
}
