//! Command-line interface for artwork-minder.
//!
//! This module provides CLI commands for fetching artwork and managing the
//! cache and config file.

mod commands;

pub use commands::{Cli, Commands, run_command};
