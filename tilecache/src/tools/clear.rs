use super::cache_args::CacheArgs;
use anyhow::Result;
use tilecache_core::cache::DiskTileStore;

#[derive(clap::Args, Debug)]
#[command(disable_version_flag = true)]
pub struct Subcommand {
	#[command(flatten)]
	pub cache: CacheArgs,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	let config = arguments.cache.load_config()?;
	let store = DiskTileStore::open(&config)?;
	store.clear()?;
	println!("cleared {:?}", store.root());
	Ok(())
}
