//! A disk-backed map tile cache: tiles are served from local storage, revalidated with
//! their ETags and downloaded when missing or stale.

pub mod cache;

pub mod config;

mod error;

pub mod net;

mod resolver;

pub mod source;

mod types;

#[cfg(any(test, feature = "test"))]
pub mod testing;

pub use config::CacheConfig;
pub use error::{ConnectionFailed, DecodeError, TransportError};
pub use resolver::{AbortReason, ResolveState, TileResolution, TileResolver};
pub use types::{Blob, TileKey};
