//! The tile source abstraction: where a tile lives remotely, where it lives on disk,
//! and how its bytes become something displayable.

mod xyz;

pub use xyz::XyzTileSource;

use crate::{Blob, DecodeError, TileKey};
use std::path::PathBuf;

/// A layer of map tiles as seen by the cache.
pub trait TileSource: Send + Sync {
	/// Displayable result of [`decode`](Self::decode).
	type Image: Send;

	/// Name of the source, used in log messages.
	fn name(&self) -> &str;

	/// Remote URL of the tile, or `None` if the source has no URL for this key.
	fn url_for(&self, key: &TileKey) -> Option<String>;

	/// Relative storage path of the tile inside the cache directory, without the
	/// cache's own file suffixes.
	fn relative_path_for(&self, key: &TileKey) -> PathBuf;

	/// Turns stored tile bytes into an image.
	fn decode(&self, content: &Blob) -> Result<Self::Image, DecodeError>;
}
