//! The disk tile store: tile content plus optional validation tokens below one root directory.
//!
//! # Layout
//!
//! For a tile whose source reports the relative path `osm/12/2200/1343.png`, the store keeps
//!
//! - `<root>/osm/12/2200/1343.png.tile`: the tile content, and
//! - `<root>/osm/12/2200/1343.png.etag`: the validation token (ETag), if the server sent one.
//!
//! A token file without its content file is ignored.
//!
//! # Usage accounting
//!
//! The store keeps a running total of the bytes of all content files. It starts at zero,
//! is rebuilt by [`DiskTileStore::reconcile`] (usually started in the background with
//! [`DiskTileStore::start_reconcile`]), grows with every write (by the difference to the
//! replaced version, if any) and shrinks with every deletion of an eviction pass. Once a
//! write pushes the total above the soft maximum, an eviction pass recounts the files on
//! disk and deletes the oldest tiles until the total is at or below the trim target.

use super::scan::{
	CONTENT_EXTENSION, ContentFile, PARTIAL_EXTENSION, list_content_files_oldest_first, remove_stale_partial_files,
	token_path_of, visit_content_files,
};
use crate::{Blob, CacheConfig, TileKey, source::TileSource};
use anyhow::{Context, Result, ensure};
use parking_lot::Mutex;
use std::{
	ffi::OsString,
	fmt::Debug,
	fs,
	io::{self, ErrorKind},
	path::{Path, PathBuf},
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
	time::{Duration, Instant},
};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Temporary files younger than this may still belong to a running write.
const STALE_PARTIAL_AGE: Duration = Duration::from_secs(60);

/// A tile as found in the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredTile {
	pub content: Blob,
	/// Validation token (ETag) stored with the content, if any.
	pub token: Option<String>,
}

/// Outcome of one eviction pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvictionReport {
	pub files_deleted: usize,
	pub bytes_freed: u64,
	pub size_before: u64,
	pub size_after: u64,
}

/// Tile content and validation tokens on local storage, with bounded total size.
pub struct DiskTileStore {
	root: PathBuf,
	max_size: u64,
	trim_size: u64,
	used_bytes: AtomicU64,
	eviction_guard: Mutex<()>,
}

impl DiskTileStore {
	/// Opens (and creates, if needed) the store at `config.cache_dir`.
	///
	/// The usage counter starts at zero; run [`reconcile`](Self::reconcile) or
	/// [`start_reconcile`](Self::start_reconcile) to account for tiles already on disk.
	pub fn open(config: &CacheConfig) -> Result<DiskTileStore> {
		ensure!(
			config.trim_size < config.max_size,
			"trim_size ({}) must be smaller than max_size ({})",
			config.trim_size,
			config.max_size
		);
		fs::create_dir_all(&config.cache_dir).with_context(|| format!("creating cache directory {:?}", config.cache_dir))?;
		log::debug!(
			"opened tile store at {:?} (max {} bytes, trim to {} bytes)",
			config.cache_dir,
			config.max_size,
			config.trim_size
		);
		Ok(DiskTileStore {
			root: config.cache_dir.clone(),
			max_size: config.max_size,
			trim_size: config.trim_size,
			used_bytes: AtomicU64::new(0),
			eviction_guard: Mutex::new(()),
		})
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Whether the storage medium is usable, i.e. the root directory exists.
	pub fn is_available(&self) -> bool {
		self.root.is_dir()
	}

	/// Bytes currently accounted to stored tile content.
	///
	/// Zero until the reconcile scan has made progress.
	pub fn used_bytes(&self) -> u64 {
		self.used_bytes.load(Ordering::SeqCst)
	}

	pub fn max_size(&self) -> u64 {
		self.max_size
	}

	pub fn trim_size(&self) -> u64 {
		self.trim_size
	}

	/// Full path of a tile's content file.
	pub fn content_path<S: TileSource + ?Sized>(&self, source: &S, key: &TileKey) -> PathBuf {
		let mut path: OsString = self.root.join(source.relative_path_for(key)).into_os_string();
		path.push(".");
		path.push(CONTENT_EXTENSION);
		PathBuf::from(path)
	}

	/// Reads a tile's content and token.
	///
	/// Returns `Ok(None)` if the tile is not stored; only I/O faults are errors.
	pub fn read<S: TileSource + ?Sized>(&self, source: &S, key: &TileKey) -> Result<Option<StoredTile>> {
		let content_path = self.content_path(source, key);
		let content = match fs::read(&content_path) {
			Ok(content) => Blob::from(content),
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(e).with_context(|| format!("reading tile {key} from {content_path:?}")),
		};
		let token = read_token_file(&token_path_of(&content_path));
		Ok(Some(StoredTile { content, token }))
	}

	/// Reads only the validation token of a stored tile.
	///
	/// `None` if there is no token, or no content the token could belong to.
	pub fn read_token<S: TileSource + ?Sized>(&self, source: &S, key: &TileKey) -> Option<String> {
		let content_path = self.content_path(source, key);
		if !content_path.is_file() {
			return None;
		}
		read_token_file(&token_path_of(&content_path))
	}

	/// Stores a tile, replacing an older version, and evicts old tiles if the store grew
	/// above its soft maximum.
	///
	/// Returns `false` if the content could not be written. A token that cannot be written
	/// is logged and otherwise ignored, the tile is then simply fetched in full next time.
	pub fn write<S: TileSource + ?Sized>(&self, source: &S, key: &TileKey, content: &Blob, token: Option<&str>) -> bool {
		self.write_at(key, &self.content_path(source, key), content, token)
	}

	/// Like [`write`](Self::write), for a path obtained from [`content_path`](Self::content_path).
	pub fn write_at(&self, key: &TileKey, content_path: &Path, content: &Blob, token: Option<&str>) -> bool {
		match self.try_write(key, content_path, content, token) {
			Ok(()) => true,
			Err(e) => {
				log::warn!("failed to store tile {key}: {e:#}");
				false
			}
		}
	}

	fn try_write(&self, key: &TileKey, content_path: &Path, content: &Blob, token: Option<&str>) -> Result<()> {
		if let Some(parent) = content_path.parent() {
			// `create_dir_all` treats a directory created concurrently by another writer as success.
			fs::create_dir_all(parent).with_context(|| format!("creating directory {parent:?}"))?;
		}

		// the token of the previous version must not survive, even if the new token cannot be written
		let token_path = token_path_of(content_path);
		remove_file_if_exists(&token_path);

		let replaced = fs::symlink_metadata(content_path)
			.ok()
			.filter(|metadata| metadata.is_file())
			.map_or(0, |metadata| metadata.len());
		write_atomically(content_path, content.as_slice())?;
		self.used_bytes.fetch_add(content.len(), Ordering::SeqCst);
		self.decrement_usage(replaced);
		log::trace!("wrote tile {key} ({} bytes) to {content_path:?}", content.len());

		if let Some(token) = token.filter(|token| !token.is_empty())
			&& let Err(e) = write_atomically(&token_path, token.as_bytes())
		{
			log::warn!("failed to store validation token of tile {key}: {e:#}");
		}

		if self.used_bytes() > self.max_size {
			self.evict();
		}
		Ok(())
	}

	/// Deletes the oldest tiles until usage is at or below the trim target.
	///
	/// A pass first corrects the usage counter with the sizes of the files it finds, so
	/// drift from racing writers or files removed by others does not outlive it.
	/// Only one pass runs at a time: if another pass is in progress this returns `None`
	/// immediately. Files that cannot be deleted are skipped.
	pub fn evict(&self) -> Option<EvictionReport> {
		self.evict_with(|path| fs::remove_file(path))
	}

	fn evict_with(&self, remove: impl Fn(&Path) -> io::Result<()>) -> Option<EvictionReport> {
		let Some(_guard) = self.eviction_guard.try_lock() else {
			log::trace!("eviction already in progress");
			return None;
		};

		let counted = self.used_bytes();
		let mut report = EvictionReport {
			size_before: counted,
			size_after: counted,
			..EvictionReport::default()
		};
		if counted <= self.trim_size {
			return Some(report);
		}

		let start = Instant::now();
		let files = list_content_files_oldest_first(&self.root);
		let on_disk: u64 = files.iter().map(|file| file.size).sum();
		if on_disk != counted {
			log::debug!("correcting tile cache usage from {counted} to {on_disk} bytes");
		}
		// keep what concurrent writers added since `counted` was read
		let _ = self.used_bytes.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
			Some(used.saturating_sub(counted).saturating_add(on_disk))
		});
		report.size_before = self.used_bytes();
		if report.size_before <= self.trim_size {
			report.size_after = report.size_before;
			return Some(report);
		}

		log::info!("trimming tile cache from {} to {} bytes", report.size_before, self.trim_size);
		for ContentFile { path, size, .. } in files {
			if self.used_bytes() <= self.trim_size {
				break;
			}
			match remove(&path) {
				Ok(()) => {
					self.decrement_usage(size);
					remove_file_if_exists(&token_path_of(&path));
					report.files_deleted += 1;
					report.bytes_freed += size;
				}
				Err(e) => log::debug!("could not delete {path:?} during eviction: {e}"),
			}
		}

		report.size_after = self.used_bytes();
		log::info!(
			"finished trimming tile cache: deleted {} files ({} bytes) in {:?}, {} bytes used",
			report.files_deleted,
			report.bytes_freed,
			start.elapsed(),
			report.size_after
		);
		Some(report)
	}

	/// Recomputes the usage counter from the files on disk and deletes temporary files
	/// left behind by interrupted writes. Returns the bytes found.
	///
	/// Reads and writes may run concurrently; the counter can be briefly off while the
	/// scan is in progress.
	pub fn rescan(&self) -> u64 {
		let start = Instant::now();
		let removed = remove_stale_partial_files(&self.root, STALE_PARTIAL_AGE);
		if removed > 0 {
			log::debug!("removed {removed} unfinished writes from {:?}", self.root);
		}

		self.used_bytes.store(0, Ordering::SeqCst);
		let mut scanned = 0u64;
		visit_content_files(&self.root, &mut |file| {
			scanned += file.size;
			self.used_bytes.fetch_add(file.size, Ordering::SeqCst);
		});
		log::debug!("found {scanned} bytes of tiles in {:?} in {:?}", self.root, start.elapsed());
		scanned
	}

	/// [`rescan`](Self::rescan), then evicts if usage is above the soft maximum.
	/// Returns the bytes found.
	pub fn reconcile(&self) -> u64 {
		let scanned = self.rescan();
		if self.used_bytes() > self.max_size {
			self.evict();
		}
		scanned
	}

	/// Runs [`reconcile`](Self::reconcile) on Tokio's blocking thread pool.
	///
	/// Must be called from within a Tokio runtime.
	pub fn start_reconcile(self: &Arc<Self>) -> JoinHandle<u64> {
		let store = Arc::clone(self);
		tokio::task::spawn_blocking(move || store.reconcile())
	}

	/// Deletes every stored tile and resets the usage counter.
	pub fn clear(&self) -> Result<()> {
		let _guard = self.eviction_guard.lock();
		match fs::remove_dir_all(&self.root) {
			Ok(()) => {}
			Err(e) if e.kind() == ErrorKind::NotFound => {}
			Err(e) => return Err(e).with_context(|| format!("removing {:?}", self.root)),
		}
		fs::create_dir_all(&self.root).with_context(|| format!("creating cache directory {:?}", self.root))?;
		self.used_bytes.store(0, Ordering::SeqCst);
		log::info!("cleared tile cache at {:?}", self.root);
		Ok(())
	}

	fn decrement_usage(&self, bytes: u64) {
		// the closure always returns `Some`, so this cannot fail
		let _ = self
			.used_bytes
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| Some(used.saturating_sub(bytes)));
	}
}

impl Debug for DiskTileStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DiskTileStore")
			.field("root", &self.root)
			.field("max_size", &self.max_size)
			.field("trim_size", &self.trim_size)
			.field("used_bytes", &self.used_bytes())
			.finish()
	}
}

/// Writes to a uniquely named sibling first and renames it into place, so that readers
/// see either the old or the new file, never a partial one.
fn write_atomically(path: &Path, data: &[u8]) -> Result<()> {
	let mut temp: OsString = path.as_os_str().to_owned();
	temp.push(format!(".{}.{PARTIAL_EXTENSION}", Uuid::new_v4().simple()));
	let temp = PathBuf::from(temp);

	fs::write(&temp, data).with_context(|| format!("writing {temp:?}"))?;
	if let Err(e) = fs::rename(&temp, path) {
		remove_file_if_exists(&temp);
		return Err(e).with_context(|| format!("moving {temp:?} to {path:?}"));
	}
	Ok(())
}

fn read_token_file(path: &Path) -> Option<String> {
	match fs::read_to_string(path) {
		Ok(token) if token.is_empty() => None,
		Ok(token) => Some(token),
		Err(e) if e.kind() == ErrorKind::NotFound => None,
		Err(e) => {
			log::warn!("failed to read validation token {path:?}: {e}");
			None
		}
	}
}

fn remove_file_if_exists(path: &Path) {
	match fs::remove_file(path) {
		Ok(()) => {}
		Err(e) if e.kind() == ErrorKind::NotFound => {}
		Err(e) => log::debug!("could not delete {path:?}: {e}"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::MockTileSource;
	use std::{thread, time::SystemTime};
	use tempfile::TempDir;

	fn new_store(max_size: u64, trim_size: u64) -> (TempDir, DiskTileStore) {
		let dir = tempfile::tempdir().unwrap();
		let mut config = CacheConfig::new(dir.path().join("tiles"));
		config.max_size = max_size;
		config.trim_size = trim_size;
		let store = DiskTileStore::open(&config).unwrap();
		(dir, store)
	}

	fn key(x: u32) -> TileKey {
		TileKey::new("mock", 10, x, 7).unwrap()
	}

	#[test]
	fn open_creates_root_and_rejects_bad_limits() {
		let dir = tempfile::tempdir().unwrap();
		let mut config = CacheConfig::new(dir.path().join("a/b/c"));
		let store = DiskTileStore::open(&config).unwrap();
		assert!(store.is_available());
		assert_eq!(store.used_bytes(), 0);

		config.trim_size = config.max_size;
		assert!(DiskTileStore::open(&config).is_err());
	}

	#[test]
	fn read_missing_tile_is_none() {
		let (_dir, store) = new_store(10_000, 5_000);
		assert_eq!(store.read(&MockTileSource::new(), &key(1)).unwrap(), None);
		assert_eq!(store.read_token(&MockTileSource::new(), &key(1)), None);
	}

	#[test]
	fn write_then_read_returns_content_and_token() {
		let (_dir, store) = new_store(10_000, 5_000);
		let source = MockTileSource::new();
		assert!(store.write(&source, &key(1), &Blob::from("tile-1"), Some("\"abc123\"")));

		let tile = store.read(&source, &key(1)).unwrap().unwrap();
		assert_eq!(tile.content, Blob::from("tile-1"));
		assert_eq!(tile.token.as_deref(), Some("\"abc123\""));
		assert_eq!(store.read_token(&source, &key(1)).as_deref(), Some("\"abc123\""));

		let path = store.content_path(&source, &key(1));
		assert!(path.starts_with(store.root()));
		assert!(path.to_str().unwrap().ends_with("mock/10/1/7.tile"));
		assert!(path.with_extension("etag").is_file());
	}

	#[test]
	fn write_without_token() {
		let (_dir, store) = new_store(10_000, 5_000);
		let source = MockTileSource::new();
		assert!(store.write(&source, &key(1), &Blob::from("tile-1"), None));
		assert!(store.write(&source, &key(2), &Blob::from("tile-2"), Some("")));
		assert_eq!(store.read(&source, &key(1)).unwrap().unwrap().token, None);
		assert_eq!(store.read(&source, &key(2)).unwrap().unwrap().token, None);
	}

	#[test]
	fn rewrite_without_token_drops_stale_token() {
		let (_dir, store) = new_store(10_000, 5_000);
		let source = MockTileSource::new();
		store.write(&source, &key(1), &Blob::from("old"), Some("v1"));
		store.write(&source, &key(1), &Blob::from("new"), None);
		let tile = store.read(&source, &key(1)).unwrap().unwrap();
		assert_eq!(tile.content, Blob::from("new"));
		assert_eq!(tile.token, None);
	}

	#[test]
	fn token_without_content_is_absent() {
		let (_dir, store) = new_store(10_000, 5_000);
		let source = MockTileSource::new();
		let content_path = store.content_path(&source, &key(3));
		fs::create_dir_all(content_path.parent().unwrap()).unwrap();
		fs::write(content_path.with_extension("etag"), "orphan").unwrap();
		assert_eq!(store.read_token(&source, &key(3)), None);
		assert_eq!(store.read(&source, &key(3)).unwrap(), None);
	}

	#[test]
	fn write_increments_usage_by_content_length() {
		let (_dir, store) = new_store(10_000, 5_000);
		let source = MockTileSource::new();
		store.write(&source, &key(1), &Blob::from(vec![0u8; 123]), Some("a-long-token-that-is-not-counted"));
		assert_eq!(store.used_bytes(), 123);
		store.write(&source, &key(2), &Blob::from(vec![0u8; 77]), None);
		assert_eq!(store.used_bytes(), 200);
	}

	#[test]
	fn concurrent_writes_are_all_counted() {
		let (_dir, store) = new_store(u64::MAX, u64::MAX - 1);
		let store = Arc::new(store);
		let handles: Vec<_> = (0..8u32)
			.map(|t| {
				let store = Arc::clone(&store);
				thread::spawn(move || {
					let source = MockTileSource::new();
					for i in 0..25u32 {
						let key = TileKey::new("mock", 12, t * 100 + i, t).unwrap();
						assert!(store.write(&source, &key, &Blob::from(vec![1u8; 10 + i as usize]), None));
					}
				})
			})
			.collect();
		for handle in handles {
			handle.join().unwrap();
		}
		let per_thread: u64 = (0..25u64).map(|i| 10 + i).sum();
		assert_eq!(store.used_bytes(), 8 * per_thread);
		assert_eq!(store.reconcile(), 8 * per_thread);
	}

	#[test]
	fn eviction_deletes_oldest_tiles_down_to_trim_target() {
		let (_dir, store) = new_store(1000, 600);
		let source = MockTileSource::new();
		let tile = Blob::from(vec![7u8; 300]);

		for x in 1..=3 {
			assert!(store.write(&source, &key(x), &tile, Some("t")));
			thread::sleep(Duration::from_millis(20));
		}
		assert_eq!(store.used_bytes(), 900);

		// the 4th tile pushes usage to 1200 and triggers eviction
		assert!(store.write(&source, &key(4), &tile, Some("t")));
		assert_eq!(store.used_bytes(), 600);
		assert_eq!(store.read(&source, &key(1)).unwrap(), None);
		assert_eq!(store.read(&source, &key(2)).unwrap(), None);
		assert!(store.read(&source, &key(3)).unwrap().is_some());
		assert!(store.read(&source, &key(4)).unwrap().is_some());
		// tokens of evicted tiles are gone as well
		assert!(!store.content_path(&source, &key(1)).with_extension("etag").exists());

		thread::sleep(Duration::from_millis(20));
		assert!(store.write(&source, &key(5), &tile, None));
		assert_eq!(store.used_bytes(), 900);
	}

	#[test]
	fn evict_below_trim_target_is_a_no_op() {
		let (_dir, store) = new_store(1000, 600);
		let source = MockTileSource::new();
		store.write(&source, &key(1), &Blob::from(vec![0u8; 500]), None);
		let report = store.evict().unwrap();
		assert_eq!(report.files_deleted, 0);
		assert_eq!(report.size_after, 500);
		assert!(store.read(&source, &key(1)).unwrap().is_some());
	}

	#[test]
	fn evict_is_single_flight() {
		let (_dir, store) = new_store(1000, 600);
		let _guard = store.eviction_guard.lock();
		assert_eq!(store.evict(), None);
	}

	#[test]
	fn evict_reports_freed_bytes() {
		let (_dir, store) = new_store(1000, 100);
		let source = MockTileSource::new();
		for x in 1..=4 {
			store.write(&source, &key(x), &Blob::from(vec![0u8; 200]), None);
			thread::sleep(Duration::from_millis(20));
		}
		// 800 bytes, below the soft maximum, so nothing was evicted yet
		assert_eq!(store.used_bytes(), 800);
		let report = store.evict().unwrap();
		assert_eq!(
			report,
			EvictionReport {
				files_deleted: 4,
				bytes_freed: 800,
				size_before: 800,
				size_after: 0,
			}
		);
	}

	#[test]
	fn reconcile_counts_existing_tiles_and_evicts() {
		let dir = tempfile::tempdir().unwrap();
		let mut config = CacheConfig::new(dir.path());
		config.max_size = 1000;
		config.trim_size = 600;

		{
			let store = DiskTileStore::open(&CacheConfig {
				max_size: u64::MAX,
				trim_size: 0,
				..config.clone()
			})
			.unwrap();
			let source = MockTileSource::new();
			for x in 1..=5 {
				store.write(&source, &key(x), &Blob::from(vec![0u8; 300]), Some("etag"));
				thread::sleep(Duration::from_millis(20));
			}
		}

		let store = DiskTileStore::open(&config).unwrap();
		assert_eq!(store.used_bytes(), 0);
		assert_eq!(store.reconcile(), 1500);
		assert_eq!(store.used_bytes(), 600);
		let source = MockTileSource::new();
		for x in 1..=3 {
			assert_eq!(store.read(&source, &key(x)).unwrap(), None);
		}
		for x in 4..=5 {
			assert!(store.read(&source, &key(x)).unwrap().is_some());
		}
	}

	#[test]
	fn rewrites_replace_the_counted_size() {
		let (_dir, store) = new_store(1000, 600);
		let source = MockTileSource::new();
		for _ in 0..6 {
			assert!(store.write(&source, &key(1), &Blob::from(vec![0u8; 300]), Some("t")));
		}
		assert_eq!(store.used_bytes(), 300);
		assert!(store.write(&source, &key(1), &Blob::from(vec![0u8; 100]), None));
		assert_eq!(store.used_bytes(), 100);

		assert!(store.write(&source, &key(2), &Blob::from(vec![0u8; 200]), None));
		assert_eq!(store.used_bytes(), 300);
		assert!(store.read(&source, &key(1)).unwrap().is_some());
		assert!(store.read(&source, &key(2)).unwrap().is_some());
	}

	#[test]
	fn eviction_corrects_an_inflated_counter() {
		let (_dir, store) = new_store(1000, 600);
		let source = MockTileSource::new();
		store.used_bytes.store(5000, Ordering::SeqCst);

		// pushes the counter above the maximum, but the disk holds only this tile
		assert!(store.write(&source, &key(1), &Blob::from(vec![0u8; 200]), None));
		assert_eq!(store.used_bytes(), 200);
		assert!(store.read(&source, &key(1)).unwrap().is_some());
	}

	#[test]
	fn failed_token_write_keeps_content() {
		let (_dir, store) = new_store(10_000, 5_000);
		let source = MockTileSource::new();
		let token_path = token_path_of(&store.content_path(&source, &key(1)));
		fs::create_dir_all(token_path.join("blocker")).unwrap();

		assert!(store.write(&source, &key(1), &Blob::from("tile-1"), Some("\"v1\"")));
		let tile = store.read(&source, &key(1)).unwrap().unwrap();
		assert_eq!(tile.content, Blob::from("tile-1"));
		assert_eq!(tile.token, None);
		assert_eq!(store.used_bytes(), 6);
	}

	#[test]
	fn rewrite_replaces_token() {
		let (_dir, store) = new_store(10_000, 5_000);
		let source = MockTileSource::new();
		store.write(&source, &key(1), &Blob::from("old"), Some("v1"));
		store.write(&source, &key(1), &Blob::from("new"), Some("v2"));
		assert_eq!(store.read_token(&source, &key(1)).as_deref(), Some("v2"));
	}

	#[test]
	fn eviction_skips_files_it_cannot_delete() {
		let (_dir, store) = new_store(1000, 600);
		let source = MockTileSource::new();
		for x in 1..=3 {
			store.write(&source, &key(x), &Blob::from(vec![0u8; 300]), Some("t"));
			thread::sleep(Duration::from_millis(20));
		}
		let stuck = store.content_path(&source, &key(1));

		let report = store
			.evict_with(|path| {
				if path == stuck {
					Err(io::Error::other("file is busy"))
				} else {
					fs::remove_file(path)
				}
			})
			.unwrap();

		assert_eq!(report.files_deleted, 1);
		assert_eq!(report.bytes_freed, 300);
		assert_eq!(store.used_bytes(), 600);
		assert!(store.read(&source, &key(1)).unwrap().is_some());
		assert_eq!(store.read(&source, &key(2)).unwrap(), None);
		assert!(store.read(&source, &key(3)).unwrap().is_some());
	}

	#[test]
	fn rescan_counts_without_evicting_and_drops_unfinished_writes() {
		let (_dir, store) = new_store(1000, 600);
		let source = MockTileSource::new();
		for x in 1..=4 {
			let path = store.content_path(&source, &key(x));
			fs::create_dir_all(path.parent().unwrap()).unwrap();
			fs::write(&path, vec![0u8; 300]).unwrap();
		}
		let mut partial = store.content_path(&source, &key(4)).into_os_string();
		partial.push(".0a1b.partial");
		fs::write(&partial, vec![0u8; 300]).unwrap();
		fs::File::options()
			.write(true)
			.open(&partial)
			.unwrap()
			.set_modified(SystemTime::now() - Duration::from_secs(3600))
			.unwrap();

		assert_eq!(store.rescan(), 1200);
		assert_eq!(store.used_bytes(), 1200);
		assert!(!PathBuf::from(partial).exists());
		for x in 1..=4 {
			assert!(store.read(&source, &key(x)).unwrap().is_some());
		}
	}

	#[tokio::test]
	async fn start_reconcile_runs_in_background() {
		let (_dir, store) = new_store(10_000, 5_000);
		let source = MockTileSource::new();
		store.write(&source, &key(1), &Blob::from(vec![0u8; 42]), None);

		let store = Arc::new(store);
		let found = store.start_reconcile().await.unwrap();
		assert_eq!(found, 42);
		assert_eq!(store.used_bytes(), 42);
	}

	#[test]
	fn clear_removes_everything() {
		let (_dir, store) = new_store(10_000, 5_000);
		let source = MockTileSource::new();
		store.write(&source, &key(1), &Blob::from("a"), Some("t"));
		store.clear().unwrap();
		assert!(store.is_available());
		assert_eq!(store.used_bytes(), 0);
		assert_eq!(store.read(&source, &key(1)).unwrap(), None);
	}

	#[test]
	fn missing_root_is_unavailable_and_write_recreates_it() {
		let (_dir, store) = new_store(10_000, 5_000);
		fs::remove_dir_all(store.root()).unwrap();
		assert!(!store.is_available());
		assert!(store.write(&MockTileSource::new(), &key(1), &Blob::from("a"), None));
		assert!(store.is_available());
	}
}
