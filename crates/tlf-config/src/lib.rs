//! # tlf-config
//!
//! Layered configuration loading for tlfkit using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`TLF_*` prefix, `__` as separator)
//! 2. Project configuration file (`tlf.toml` by default, must exist)
//! 3. User-level `~/.config/tlf/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `TLF_PATHS__OUTPUT_DIR` -> `paths.output_dir`, `TLF_RUN__JOBS` -> `run.jobs`, etc.
//! The `__` (double underscore) separates nested config sections.
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//! use tlf_config::TlfConfig;
//!
//! let config = TlfConfig::load_with_dotenv(Path::new("tlf.toml")).expect("config");
//! for report in &config.reports {
//!     println!("{} ({})", report.id, report.family);
//! }
//! ```

mod error;
mod paths;
mod report;
mod run;

pub use error::ConfigError;
pub use paths::PathsConfig;
pub use report::{InputConfig, ParamsConfig, PopulationConfig, RenderConfig, ReportConfig};
pub use run::RunConfig;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Selector accepted by [`TlfConfig::select`] meaning every report.
pub const ALL_REPORTS: &str = "all";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct TlfConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub reports: Vec<ReportConfig>,
}

impl TlfConfig {
    /// Load configuration from all sources and validate report identifiers.
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] if you need `.env` file loading.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NotFound`] when `config_path` does not exist,
    /// [`ConfigError::Figment`] when any source fails to parse, and
    /// [`ConfigError::InvalidValue`] when report identifiers are unusable.
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.is_file() {
            return Err(ConfigError::NotFound {
                path: config_path.to_path_buf(),
            });
        }
        let config: Self = Self::figment(config_path).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    ///
    /// Loads `.env` from the directory of `config_path` (falling back to the
    /// current directory) before building the figment.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv(config_path: &Path) -> Result<Self, ConfigError> {
        Self::load_dotenv_near(config_path);
        Self::load(config_path)
    }

    /// Build the figment provider chain.
    ///
    /// This is public so tests can inspect the figment directly or add
    /// additional providers on top.
    #[must_use]
    pub fn figment(config_path: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        // Layer 2: Project config
        figment = figment.merge(Toml::file(config_path));

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("TLF_").split("__"))
    }

    /// Directory that relative `paths.*` entries resolve against.
    #[must_use]
    pub fn base_dir(config_path: &Path) -> PathBuf {
        config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }

    /// Check that report identifiers are non-empty, unique, and usable as file names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the offending report.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::with_capacity(self.reports.len());
        for (index, report) in self.reports.iter().enumerate() {
            let field = format!("reports[{index}].id");
            if report.id.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "report id must not be empty".into(),
                });
            }
            if report.id == ALL_REPORTS {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("'{ALL_REPORTS}' is reserved"),
                });
            }
            if !report
                .id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!(
                        "'{}' may only contain ASCII letters, digits, '_', '-' and '.'",
                        report.id
                    ),
                });
            }
            if !seen.insert(report.id.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("duplicate report id '{}'", report.id),
                });
            }
        }
        Ok(())
    }

    /// Resolve report selectors to configured reports, in configuration order.
    ///
    /// An empty selector list or the single selector `all` selects every report.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownReport`] for the first unknown id.
    pub fn select(&self, selectors: &[String]) -> Result<Vec<&ReportConfig>, ConfigError> {
        if selectors.is_empty() || selectors.iter().any(|s| s == ALL_REPORTS) {
            return Ok(self.reports.iter().collect());
        }
        for id in selectors {
            if !self.reports.iter().any(|r| r.id == *id) {
                return Err(ConfigError::UnknownReport { id: id.clone() });
            }
        }
        Ok(self
            .reports
            .iter()
            .filter(|r| selectors.contains(&r.id))
            .collect())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tlf").join("config.toml"))
    }

    /// Load `.env` from the config file's directory, else the current dir.
    /// Silently does nothing if no `.env` is found.
    fn load_dotenv_near(config_path: &Path) {
        let env_path = Self::base_dir(config_path).join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
            return;
        }
        let _ = dotenvy::dotenv();
    }
}
