#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stderr)] // logging may not exist yet

use anyhow::Result;
use clap::Parser as _;
use tabletalk::{cli, logging};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("File logging unavailable: {e:#}");
    }

    tokio::runtime::Runtime::new()?.block_on(cli::run_command(cli.command))
}
