use std::path::PathBuf;

use clap::Parser;

pub mod global;
pub mod root_commands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `tlf` binary.
#[derive(Debug, Parser)]
#[command(name = "tlf", version, about = "Clinical summary tables, listings and figures")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project configuration file
    #[arg(short, long, global = true, default_value = "tlf.toml")]
    pub config: PathBuf,

    /// Output format: json, table, raw
    #[arg(short, long, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            config: self.config.clone(),
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
        }
    }
}
