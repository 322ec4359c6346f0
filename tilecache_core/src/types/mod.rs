mod blob;
mod tile_key;

pub use blob::Blob;
pub use tile_key::TileKey;
