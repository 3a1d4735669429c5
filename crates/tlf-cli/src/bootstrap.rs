use anyhow::Context;
use tlf_config::TlfConfig;

use crate::cli::GlobalFlags;

/// Load the project configuration named by `--config`, with `.env` support.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<TlfConfig> {
    TlfConfig::load_with_dotenv(&flags.config)
        .with_context(|| format!("failed to load configuration from {}", flags.config.display()))
}
