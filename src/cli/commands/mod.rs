//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `fetch`: request artwork through the engine and save it
//! - `cache`: clear or measure the disk cache
//! - `config`: locate or print the config file

mod cache;
mod config;
mod fetch;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tokio::runtime::Runtime;

use artwork_minder::artwork::ArtworkKind;

pub use cache::{cmd_cache_clear, cmd_cache_size};
pub use config::{cmd_config_path, cmd_config_set, cmd_config_show};
pub use fetch::{FetchArgs, cmd_fetch};

/// Artwork Minder CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch artwork for an album, artist or URI
    Fetch(FetchArgs),
    /// Manage the artwork cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Inspect the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Delete every cached image, in memory and on disk
    Clear,
    /// Show the disk cache location and size
    Size,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the config file path
    Path,
    /// Print the effective configuration
    Show,
    /// Set a value, e.g. `preferences.only_on_wifi false`
    Set {
        /// Dotted key (`section.field`)
        key: String,
        /// New value; empty clears optional fields
        value: String,
    },
}

/// Artwork resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Thumbnail,
    Full,
}

impl From<KindArg> for ArtworkKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Thumbnail => ArtworkKind::Thumbnail,
            KindArg::Full => ArtworkKind::Full,
        }
    }
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;

    match &cli.command {
        Commands::Fetch(args) => cmd_fetch(&rt, args),
        Commands::Cache { action } => match action {
            CacheAction::Clear => cmd_cache_clear(&rt),
            CacheAction::Size => cmd_cache_size(),
        },
        Commands::Config { action } => match action {
            ConfigAction::Path => cmd_config_path(),
            ConfigAction::Show => cmd_config_show(),
            ConfigAction::Set { key, value } => cmd_config_set(key, value),
        },
    }
}

/// Human-readable byte count
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Default output file for `fetch`
fn default_output(kind: ArtworkKind) -> PathBuf {
    PathBuf::from(format!("artwork-{}.jpg", kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::parse_from([
            "artwork-minder",
            "fetch",
            "--artist",
            "Low",
            "--album",
            "Double Negative",
            "--kind",
            "thumbnail",
            "--metered",
        ]);
        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.artist.as_deref(), Some("Low"));
        assert_eq!(args.kind, KindArg::Thumbnail);
        assert!(args.metered);
        assert!(!args.offline);
    }

    #[test]
    fn test_offline_conflicts_with_metered() {
        let result = Cli::try_parse_from(["artwork-minder", "fetch", "--offline", "--metered"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_config_set() {
        let cli = Cli::parse_from(["artwork-minder", "config", "set", "cache.full_size", "800"]);
        let Commands::Config {
            action: ConfigAction::Set { key, value },
        } = cli.command
        else {
            panic!("expected config set");
        };
        assert_eq!(key, "cache.full_size");
        assert_eq!(value, "800");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(256 * 1024 * 1024), "256.0 MiB");
    }

    #[test]
    fn test_default_output() {
        assert_eq!(default_output(ArtworkKind::Full), PathBuf::from("artwork-full.jpg"));
    }
}
