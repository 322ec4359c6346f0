//! Local storage: the disk tile store and the memory of "not found" URLs.

mod disk_store;
mod not_found;
mod scan;

pub use disk_store::{DiskTileStore, EvictionReport, StoredTile};
pub use not_found::NotFoundCache;
