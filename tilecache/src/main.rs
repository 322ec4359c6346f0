mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{ErrorLevel, Verbosity};

#[derive(Parser, Debug)]
#[command(
	author,
	version,
	about,
	long_about = None,
	propagate_version = true,
	disable_help_subcommand = true,
)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	#[command(flatten)]
	verbose: Verbosity<ErrorLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Fetch one tile through the cache
	Get(tools::get::Subcommand),

	/// Scan the cache and show how much space it uses
	Usage(tools::usage::Subcommand),

	/// Delete the oldest tiles until the cache is at its trim size
	Trim(tools::trim::Subcommand),

	/// Delete all cached tiles
	Clear(tools::clear::Subcommand),
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	env_logger::Builder::new()
		.filter_level(cli.verbose.log_level_filter())
		.format_timestamp(None)
		.init();

	run(cli)
}

fn run(cli: Cli) -> Result<()> {
	match &cli.command {
		Commands::Get(arguments) => tools::get::run(arguments),
		Commands::Usage(arguments) => tools::usage::run(arguments),
		Commands::Trim(arguments) => tools::trim::run(arguments),
		Commands::Clear(arguments) => tools::clear::run(arguments),
	}
}
