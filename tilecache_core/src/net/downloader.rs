//! Revalidation and download of single tiles.
//!
//! [`TileDownloader`] talks to the tile server on behalf of the resolver: it asks whether a
//! stored tile is still current (conditional `GET` with `If-None-Match`) and downloads tiles
//! into the [`DiskTileStore`]. URLs that answered `404` are remembered in a
//! [`NotFoundCache`] and not requested again until their entry expires.

use super::{NetworkAvailability, TileHttpClient};
use crate::{
	CacheConfig, ConnectionFailed, TileKey, TransportError,
	cache::{DiskTileStore, NotFoundCache},
	source::TileSource,
};
use std::{fmt::Debug, sync::Arc};

const USER_AGENT: &str = "User-Agent";
const IF_NONE_MATCH: &str = "If-None-Match";
const ETAG: &str = "ETag";

/// Answer of [`TileDownloader::is_current`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Freshness {
	/// The stored copy matches the server's, or the URL is known not to exist.
	Current,
	/// The stored copy has to be downloaded again.
	Stale,
	/// The network is unavailable; nothing was asked.
	Offline,
}

/// Revalidates and downloads tiles, storing them in a [`DiskTileStore`].
pub struct TileDownloader {
	store: Arc<DiskTileStore>,
	not_found: NotFoundCache,
	client: Arc<dyn TileHttpClient>,
	network: Arc<dyn NetworkAvailability>,
	user_agent: String,
}

impl TileDownloader {
	pub fn new(
		config: &CacheConfig,
		store: Arc<DiskTileStore>,
		client: Arc<dyn TileHttpClient>,
		network: Arc<dyn NetworkAvailability>,
	) -> TileDownloader {
		TileDownloader {
			store,
			not_found: NotFoundCache::new(config.not_found_capacity, config.not_found_ttl),
			client,
			network,
			user_agent: config.user_agent.clone(),
		}
	}

	pub fn store(&self) -> &Arc<DiskTileStore> {
		&self.store
	}

	pub fn not_found_cache(&self) -> &NotFoundCache {
		&self.not_found
	}

	/// Checks whether the stored copy of a tile is still current.
	///
	/// Without a stored validation token there is nothing to revalidate against, so the
	/// tile counts as stale. URLs in the not-found cache count as current. Only a refused
	/// or unreachable connection is an error; timeouts and other transport problems are
	/// logged and reported as [`Freshness::Stale`].
	pub async fn is_current<S: TileSource + ?Sized>(&self, source: &S, key: &TileKey) -> Result<Freshness, ConnectionFailed> {
		if !self.network.is_network_available() {
			log::debug!("network unavailable, not revalidating tile {key}");
			return Ok(Freshness::Offline);
		}

		let Some(url) = tile_url(source, key) else {
			return Ok(Freshness::Stale);
		};

		if self.not_found.is_not_found_cached(&url) {
			log::trace!("'{url}' is known to not exist");
			return Ok(Freshness::Current);
		}

		let Some(token) = self.store.read_token(source, key) else {
			log::trace!("tile {key} has no validation token");
			return Ok(Freshness::Stale);
		};

		let headers = [(USER_AGENT, self.user_agent.as_str()), (IF_NONE_MATCH, token.as_str())];
		match self.client.get(&url, &headers).await {
			Ok(response) if response.status == 304 => {
				log::trace!("tile {key} is current");
				Ok(Freshness::Current)
			}
			Ok(response) => {
				log::debug!("tile {key} is stale, revalidation of '{url}' returned {}", response.status);
				Ok(Freshness::Stale)
			}
			Err(TransportError::Connect(message)) => Err(ConnectionFailed { url, message }),
			Err(TransportError::Other(message)) => {
				log::warn!("revalidating '{url}' failed: {message}");
				Ok(Freshness::Stale)
			}
		}
	}

	/// Downloads a tile and stores it.
	///
	/// Returns `Ok(true)` if the tile was downloaded and stored. A `404` marks the URL as
	/// not found, other statuses are logged; both return `Ok(false)`, as does a URL that
	/// is known not to exist.
	pub async fn fetch<S: TileSource + ?Sized>(&self, source: &S, key: &TileKey) -> Result<bool, ConnectionFailed> {
		if !self.network.is_network_available() {
			log::debug!("network unavailable, not downloading tile {key}");
			return Ok(false);
		}

		let Some(url) = tile_url(source, key) else {
			return Ok(false);
		};

		if self.not_found.is_not_found_cached(&url) {
			log::trace!("skipping '{url}', it is known to not exist");
			return Ok(false);
		}
		self.not_found.clear_not_found(&url);

		let response = match self.client.get(&url, &[(USER_AGENT, self.user_agent.as_str())]).await {
			Ok(response) => response,
			Err(TransportError::Connect(message)) => return Err(ConnectionFailed { url, message }),
			Err(TransportError::Other(message)) => {
				log::warn!("downloading '{url}' failed: {message}");
				return Ok(false);
			}
		};

		let status = response.status;
		match status {
			200 => {
				let token = response
					.header(ETAG)
					.filter(|token| !token.is_empty())
					.map(str::to_owned);
				log::trace!("downloaded tile {key} ({} bytes) from '{url}'", response.body.len());

				// a write can start an eviction pass over the whole cache directory
				let store = Arc::clone(&self.store);
				let content_path = store.content_path(source, key);
				let tile_key = key.clone();
				let body = response.body;
				let stored = tokio::task::spawn_blocking(move || {
					store.write_at(&tile_key, &content_path, &body, token.as_deref())
				})
				.await;
				Ok(stored.unwrap_or_else(|e| {
					log::warn!("storing tile {key} failed: {e}");
					false
				}))
			}
			404 => {
				log::debug!("'{url}' does not exist");
				self.not_found.mark_not_found(&url);
				Ok(false)
			}
			_ => {
				log::warn!("downloading '{url}' returned unexpected status {status}");
				Ok(false)
			}
		}
	}
}

fn tile_url<S: TileSource + ?Sized>(source: &S, key: &TileKey) -> Option<String> {
	let url = source.url_for(key).filter(|url| !url.is_empty());
	if url.is_none() {
		log::debug!("source '{}' has no URL for tile {key}", source.name());
	}
	url
}

impl Debug for TileDownloader {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TileDownloader")
			.field("store", &self.store)
			.field("not_found", &self.not_found)
			.field("user_agent", &self.user_agent)
			.finish_non_exhaustive()
	}
}
