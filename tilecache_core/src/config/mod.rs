//! Configuration of the tile cache.
//!
//! A [`CacheConfig`] can be built in code (starting from [`CacheConfig::default`]) or read
//! from YAML:
//!
//! ```yaml
//! cache_dir: /var/cache/tiles
//! max_size: 600MB
//! trim_size: 500MB
//! not_found_ttl: 3600
//! not_found_capacity: 2000
//! ```
//!
//! The default cache directory can be controlled with the environment variable
//! `TILECACHE_CACHE_DIR`. If unset, `tilecache` inside the system temporary folder is used.

mod size;

pub use size::{format_size, parse_size};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Deserializer};
use std::{
	fs::File,
	io::{BufReader, Read},
	path::{Path, PathBuf},
	time::Duration,
};

/// Limits and network settings shared by the disk store and the fetch delegate.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct CacheConfig {
	/// Root directory of the disk tile store.
	pub cache_dir: PathBuf,

	/// Soft maximum: eviction starts once the stored content exceeds this many bytes.
	#[serde(deserialize_with = "size::deserialize_size")]
	pub max_size: u64,

	/// Trim target: an eviction pass deletes tiles until usage is at or below this.
	#[serde(deserialize_with = "size::deserialize_size")]
	pub trim_size: u64,

	/// How long a "404 Not Found" answer is remembered, in seconds.
	#[serde(deserialize_with = "deserialize_seconds")]
	pub not_found_ttl: Duration,

	/// Maximum number of remembered "404 Not Found" URLs.
	pub not_found_capacity: usize,

	/// Value of the `User-Agent` header sent with every tile request.
	pub user_agent: String,

	/// Timeout of a single HTTP request, in seconds.
	#[serde(deserialize_with = "deserialize_seconds")]
	pub request_timeout: Duration,
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			cache_dir: default_cache_dir(),
			max_size: 600 * 1024 * 1024,
			trim_size: 500 * 1024 * 1024,
			not_found_ttl: Duration::from_secs(60 * 60),
			not_found_capacity: 2000,
			user_agent: format!("tilecache/{}", env!("CARGO_PKG_VERSION")),
			request_timeout: Duration::from_secs(30),
		}
	}
}

impl CacheConfig {
	/// A default configuration rooted at `cache_dir`.
	pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
		Self {
			cache_dir: cache_dir.into(),
			..Self::default()
		}
	}

	pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
		let config: Self = serde_yaml_ng::from_reader(reader)?;
		config.validate()?;
		Ok(config)
	}

	pub fn from_string(text: &str) -> Result<Self> {
		let config: Self = serde_yaml_ng::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	/// Read a YAML file. A relative `cache_dir` is resolved against the file's directory.
	pub fn from_path(path: &Path) -> Result<Self> {
		let file = File::open(path).with_context(|| format!("opening config file {path:?}"))?;
		let mut config = Self::from_reader(BufReader::new(file)).with_context(|| format!("parsing config file {path:?}"))?;
		if config.cache_dir.is_relative()
			&& let Some(parent) = path.parent()
		{
			config.cache_dir = parent.join(&config.cache_dir);
		}
		Ok(config)
	}

	/// Checks the invariants between the limits.
	pub fn validate(&self) -> Result<()> {
		ensure!(
			self.trim_size < self.max_size,
			"trim_size ({}) must be smaller than max_size ({})",
			self.trim_size,
			self.max_size
		);
		ensure!(self.not_found_capacity > 0, "not_found_capacity must be at least 1");
		ensure!(!self.not_found_ttl.is_zero(), "not_found_ttl must be at least 1 second");
		ensure!(!self.request_timeout.is_zero(), "request_timeout must be at least 1 second");
		Ok(())
	}

	pub fn override_optional_cache_dir(&mut self, cache_dir: &Option<PathBuf>) {
		if let Some(cache_dir) = cache_dir {
			self.cache_dir = cache_dir.clone();
		}
	}
	pub fn override_optional_max_size(&mut self, max_size: &Option<u64>) {
		if let Some(max_size) = max_size {
			self.max_size = *max_size;
		}
	}
	pub fn override_optional_trim_size(&mut self, trim_size: &Option<u64>) {
		if let Some(trim_size) = trim_size {
			self.trim_size = *trim_size;
		}
	}
}

fn default_cache_dir() -> PathBuf {
	std::env::var("TILECACHE_CACHE_DIR").map_or_else(|_| std::env::temp_dir().join("tilecache"), PathBuf::from)
}

fn deserialize_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Duration, D::Error> {
	Ok(Duration::from_secs(u64::deserialize(deserializer)?))
}
