use super::cache_args::CacheArgs;
use anyhow::{Context, Result, bail};
use std::{fs, path::PathBuf, sync::Arc};
use tilecache_core::{
	TileKey, TileResolution, TileResolver,
	net::{AlwaysOnline, ReqwestClient},
	source::XyzTileSource,
};

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true, verbatim_doc_comment)]
pub struct Subcommand {
	/// Base URL of the tile server.
	/// Tiles are requested as "<URL><z>/<x>/<y><suffix>",
	///    e.g. "https://tile.openstreetmap.org/" for OpenStreetMap tiles.
	#[arg(required = true, verbatim_doc_comment)]
	pub url: String,

	/// Zoom level
	pub z: u8,

	/// Column
	pub x: u32,

	/// Row
	pub y: u32,

	/// Name of the tile layer, also used as directory inside the cache
	#[arg(long, default_value = "tiles", display_order = 2)]
	pub name: String,

	/// File suffix of the tiles
	#[arg(long, default_value = ".png", display_order = 2)]
	pub suffix: String,

	/// Write the tile to this file
	#[arg(short, long, value_name = "FILE", display_order = 2)]
	pub output: Option<PathBuf>,

	#[command(flatten)]
	pub cache: CacheArgs,
}

#[tokio::main]
pub async fn run(arguments: &Subcommand) -> Result<()> {
	let config = arguments.cache.load_config()?;
	let source = XyzTileSource::new(&arguments.name, &[arguments.url.as_str()], &arguments.suffix)?;
	let key = TileKey::new(&arguments.name, arguments.z, arguments.x, arguments.y)?;

	let client = Arc::new(ReqwestClient::from_config(&config)?);
	let resolver = TileResolver::open(&config, client, Arc::new(AlwaysOnline))?;

	match resolver.resolve_tile(&source, &key).await {
		TileResolution::Content(image) => {
			let stored = resolver
				.store()
				.read(&source, &key)?
				.with_context(|| format!("tile {key} is no longer in the cache"))?;
			println!(
				"tile {key}: {}x{} pixels, {} bytes",
				image.width(),
				image.height(),
				stored.content.len()
			);
			if let Some(output) = &arguments.output {
				fs::write(output, stored.content.as_slice()).with_context(|| format!("writing tile to {output:?}"))?;
			}
		}
		TileResolution::NoResult => println!("tile {key}: not available"),
		TileResolution::Aborted(reason) => bail!("resolving tile {key} aborted: {reason}"),
	}
	Ok(())
}
