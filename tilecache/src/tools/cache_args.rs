use anyhow::Result;
use std::path::PathBuf;
use tilecache_core::{CacheConfig, config::parse_size};

/// Cache options shared by all subcommands.
#[derive(clap::Args, Debug)]
pub struct CacheArgs {
	/// Path to a configuration file (YAML format).
	/// Command line arguments override configuration file settings.
	#[arg(short = 'c', long, value_name = "FILE", verbatim_doc_comment, display_order = 0)]
	pub config: Option<PathBuf>,

	/// Cache directory. Default: "tilecache" in the system's temporary directory
	#[arg(long, value_name = "DIR", display_order = 0)]
	pub cache_dir: Option<PathBuf>,

	/// Size above which old tiles are deleted, e.g. "600MB". Default: 600MB
	#[arg(long, value_name = "SIZE", value_parser = parse_size, display_order = 1)]
	pub max_size: Option<u64>,

	/// Size the cache is trimmed down to, e.g. "500MB". Default: 500MB
	#[arg(long, value_name = "SIZE", value_parser = parse_size, display_order = 1)]
	pub trim_size: Option<u64>,
}

impl CacheArgs {
	pub fn load_config(&self) -> Result<CacheConfig> {
		let mut config = if let Some(config_path) = &self.config {
			CacheConfig::from_path(config_path)?
		} else {
			CacheConfig::default()
		};

		config.override_optional_cache_dir(&self.cache_dir);
		config.override_optional_max_size(&self.max_size);
		config.override_optional_trim_size(&self.trim_size);
		config.validate()?;

		log::debug!("using cache directory {:?}", config.cache_dir);
		Ok(config)
	}
}
