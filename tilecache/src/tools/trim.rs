use super::cache_args::CacheArgs;
use anyhow::Result;
use tilecache_core::{
	cache::{DiskTileStore, EvictionReport},
	config::format_size,
};

#[derive(clap::Args, Debug)]
#[command(disable_version_flag = true)]
pub struct Subcommand {
	#[command(flatten)]
	pub cache: CacheArgs,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	let config = arguments.cache.load_config()?;
	let store = DiskTileStore::open(&config)?;
	if let Some(report) = trim(&store) {
		println!(
			"deleted {} tiles ({}), {} used",
			report.files_deleted,
			format_size(report.bytes_freed),
			format_size(report.size_after)
		);
	}
	Ok(())
}

/// Recounts the store and runs a single eviction pass down to the trim target.
fn trim(store: &DiskTileStore) -> Option<EvictionReport> {
	store.rescan();
	store.evict()
}
