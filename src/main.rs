//! Artwork Minder command-line tool.
//!
//! Fetches artwork through the same engine a player would use, and manages
//! the on-disk cache and config file.

mod cli;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("artwork_minder=info".parse()?))
        .init();

    cli::run_command(&args)
}
