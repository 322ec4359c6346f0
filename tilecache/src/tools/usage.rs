use super::cache_args::CacheArgs;
use anyhow::Result;
use tilecache_core::{cache::DiskTileStore, config::format_size};

#[derive(clap::Args, Debug)]
#[command(disable_version_flag = true)]
pub struct Subcommand {
	#[command(flatten)]
	pub cache: CacheArgs,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	let config = arguments.cache.load_config()?;
	let store = DiskTileStore::open(&config)?;
	let used = store.reconcile();
	println!(
		"{:?}: {} used (trimmed to {} above {})",
		store.root(),
		format_size(used),
		format_size(store.trim_size()),
		format_size(store.max_size())
	);
	Ok(())
}
