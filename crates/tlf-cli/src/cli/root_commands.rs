use clap::{Args, Subcommand};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Run reports and write their artifacts.
    Run(RunArgs),
    /// List configured reports.
    List,
    /// Validate report parameters and render specs without loading data.
    Check,
    /// Show a dataset's schema, row count and checksum.
    Inspect(InspectArgs),
    /// Print the JSON Schema of the configuration file.
    Schema,
}

#[derive(Clone, Debug, Args)]
pub struct RunArgs {
    /// Report ids to run; none or `all` runs every report.
    pub reports: Vec<String>,

    /// Maximum reports processed concurrently (0 = available cores).
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Skip reports not started within this many seconds.
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Do not write manifest.json.
    #[arg(long)]
    pub no_manifest: bool,
}

#[derive(Clone, Debug, Args)]
pub struct InspectArgs {
    /// Dataset name, resolved in the configured data directory.
    pub dataset: String,
}
