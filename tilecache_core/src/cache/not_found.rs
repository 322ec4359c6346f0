//! A bounded, thread-safe memory of URLs that recently answered "404 Not Found".
//!
//! Entries expire after a fixed time to live. Expired entries are dropped lazily when they
//! are looked up or when they sit at the least recently used end during an insert; there
//! is no sweeper thread. Once the capacity is reached, inserting evicts the least
//! recently used URL.
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//! use tilecache_core::cache::NotFoundCache;
//!
//! let cache = NotFoundCache::new(2000, Duration::from_secs(3600));
//! cache.mark_not_found("https://tile.example.org/3/1/2.png");
//! assert!(cache.is_not_found_cached("https://tile.example.org/3/1/2.png"));
//! cache.clear_not_found("https://tile.example.org/3/1/2.png");
//! assert!(!cache.is_not_found_cached("https://tile.example.org/3/1/2.png"));
//! ```

use lru::LruCache;
use parking_lot::Mutex;
use std::{
	fmt::Debug,
	num::NonZeroUsize,
	time::{Duration, Instant},
};

/// Maps a remote URL to the instant its "not found" result expires.
pub struct NotFoundCache {
	entries: Mutex<LruCache<String, Instant>>,
	ttl: Duration,
}

impl NotFoundCache {
	/// Creates a cache holding at most `capacity` URLs (at least one), each for `ttl`.
	#[must_use]
	pub fn new(capacity: usize, ttl: Duration) -> Self {
		let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
		Self {
			entries: Mutex::new(LruCache::new(capacity)),
			ttl,
		}
	}

	/// Records that `url` answered "not found"; it stays marked for the configured time to live.
	pub fn mark_not_found(&self, url: &str) {
		self.mark_at(url, Instant::now());
	}

	/// `true` only if `url` is marked and the mark has not expired yet.
	pub fn is_not_found_cached(&self, url: &str) -> bool {
		self.is_cached_at(url, Instant::now())
	}

	/// Forgets `url`, regardless of its expiry.
	pub fn clear_not_found(&self, url: &str) {
		self.entries.lock().pop(url);
	}

	/// Number of entries held, expired ones included until they are dropped.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	fn mark_at(&self, url: &str, now: Instant) {
		let mut entries = self.entries.lock();
		while entries.peek_lru().is_some_and(|(_, expiry)| *expiry <= now) {
			entries.pop_lru();
		}
		entries.put(url.to_owned(), now + self.ttl);
	}

	fn is_cached_at(&self, url: &str, now: Instant) -> bool {
		let mut entries = self.entries.lock();
		match entries.get(url).copied() {
			Some(expiry) if expiry > now => true,
			Some(_) => {
				entries.pop(url);
				false
			}
			None => false,
		}
	}
}

impl Debug for NotFoundCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let entries = self.entries.lock();
		f.debug_struct("NotFoundCache")
			.field("length", &entries.len())
			.field("capacity", &entries.cap())
			.field("ttl", &self.ttl)
			.finish()
	}
}
