//! Resolution of a single tile request: local store first, then revalidation, then download.

use crate::{
	Blob, CacheConfig, ConnectionFailed, DecodeError, TileKey,
	cache::DiskTileStore,
	net::{Freshness, NetworkAvailability, TileDownloader, TileHttpClient},
	source::TileSource,
};
use anyhow::Result;
use std::{fmt::Debug, sync::Arc};
use thiserror::Error;

/// Outcome of [`TileResolver::resolve_tile`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TileResolution<T> {
	/// The decoded tile.
	Content(T),
	/// No tile this time; asking again later may succeed.
	NoResult,
	/// Further requests are pointless for now, callers should stop issuing them.
	Aborted(AbortReason),
}

impl<T> TileResolution<T> {
	pub fn is_content(&self) -> bool {
		matches!(self, TileResolution::Content(_))
	}

	pub fn into_content(self) -> Option<T> {
		match self {
			TileResolution::Content(content) => Some(content),
			_ => None,
		}
	}
}

/// Why a resolution was aborted.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AbortReason {
	/// The tile server is unreachable.
	#[error(transparent)]
	ConnectionFailed(ConnectionFailed),
	/// The stored tile could not be decoded.
	#[error("cannot continue: {0}")]
	LowMemory(DecodeError),
}

/// States a resolution passes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveState {
	NotStarted,
	CheckedLocal,
	Revalidating,
	Fetching,
	Decoding,
	Done,
	Aborted,
}

enum Step<T> {
	NotStarted,
	CheckedLocal(Option<Blob>),
	Revalidating(Blob),
	Fetching,
	Decoding(Blob),
	Finished(TileResolution<T>),
}

impl<T> Step<T> {
	fn state(&self) -> ResolveState {
		match self {
			Step::NotStarted => ResolveState::NotStarted,
			Step::CheckedLocal(_) => ResolveState::CheckedLocal,
			Step::Revalidating(_) => ResolveState::Revalidating,
			Step::Fetching => ResolveState::Fetching,
			Step::Decoding(_) => ResolveState::Decoding,
			Step::Finished(TileResolution::Aborted(_)) => ResolveState::Aborted,
			Step::Finished(_) => ResolveState::Done,
		}
	}
}

/// Serves tile requests from the disk store, revalidating and downloading as needed.
///
/// Retrying is left to the caller: a [`TileResolution::NoResult`] is meant to be asked for
/// again on a later redraw, an [`TileResolution::Aborted`] tells the caller to back off.
pub struct TileResolver {
	downloader: TileDownloader,
}

impl TileResolver {
	pub fn new(downloader: TileDownloader) -> TileResolver {
		TileResolver { downloader }
	}

	/// Opens the store below `config.cache_dir` and starts its background usage scan.
	///
	/// Must be called from within a Tokio runtime.
	pub fn open(
		config: &CacheConfig,
		client: Arc<dyn TileHttpClient>,
		network: Arc<dyn NetworkAvailability>,
	) -> Result<TileResolver> {
		let store = Arc::new(DiskTileStore::open(config)?);
		store.start_reconcile();
		Ok(TileResolver::new(TileDownloader::new(config, store, client, network)))
	}

	pub fn downloader(&self) -> &TileDownloader {
		&self.downloader
	}

	pub fn store(&self) -> &Arc<DiskTileStore> {
		self.downloader.store()
	}

	/// Resolves one tile.
	///
	/// A stored tile is revalidated and served if still current (or if the network is
	/// offline). Missing or stale tiles are downloaded, stored and then served from the
	/// store. Without usable storage nothing is downloaded.
	pub async fn resolve_tile<S: TileSource + ?Sized>(&self, source: &S, key: &TileKey) -> TileResolution<S::Image> {
		let store = self.store();
		let mut step = Step::NotStarted;
		loop {
			log::trace!("resolving tile {key}: {:?}", step.state());
			step = match step {
				Step::NotStarted => {
					if store.is_available() {
						Step::CheckedLocal(read_content(store, source, key))
					} else {
						log::debug!("cache directory {:?} is unavailable", store.root());
						Step::Finished(TileResolution::NoResult)
					}
				}
				Step::CheckedLocal(Some(content)) => Step::Revalidating(content),
				Step::CheckedLocal(None) => Step::Fetching,
				Step::Revalidating(content) => match self.downloader.is_current(source, key).await {
					Ok(Freshness::Current | Freshness::Offline) => Step::Decoding(content),
					Ok(Freshness::Stale) => Step::Fetching,
					Err(e) => abort_on_connection(e),
				},
				Step::Fetching => match self.downloader.fetch(source, key).await {
					Ok(true) => match read_content(store, source, key) {
						Some(content) => Step::Decoding(content),
						None => {
							log::debug!("tile {key} vanished right after being stored");
							Step::Finished(TileResolution::NoResult)
						}
					},
					Ok(false) => Step::Finished(TileResolution::NoResult),
					Err(e) => abort_on_connection(e),
				},
				Step::Decoding(content) => match source.decode(&content) {
					Ok(image) => Step::Finished(TileResolution::Content(image)),
					Err(e) => {
						log::warn!("decoding tile {key} failed: {e}");
						Step::Finished(TileResolution::Aborted(AbortReason::LowMemory(e)))
					}
				},
				Step::Finished(resolution) => return resolution,
			};
		}
	}
}

fn read_content<S: TileSource + ?Sized>(store: &DiskTileStore, source: &S, key: &TileKey) -> Option<Blob> {
	match store.read(source, key) {
		Ok(tile) => tile.map(|tile| tile.content),
		Err(e) => {
			log::warn!("{e:#}");
			None
		}
	}
}

fn abort_on_connection<T>(error: ConnectionFailed) -> Step<T> {
	log::warn!("aborting tile resolution: {error}");
	Step::Finished(TileResolution::Aborted(AbortReason::ConnectionFailed(error)))
}

impl Debug for TileResolver {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TileResolver").field("downloader", &self.downloader).finish()
	}
}
