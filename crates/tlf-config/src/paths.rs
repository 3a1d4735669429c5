//! Input and output directory configuration.

use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct PathsConfig {
    /// Directory holding one columnar file per named dataset.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory receiving one rendered document per report.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
        }
    }
}

impl PathsConfig {
    /// Data directory, relative paths resolved against `base`.
    #[must_use]
    pub fn data_dir_in(&self, base: &Path) -> PathBuf {
        resolve(base, &self.data_dir)
    }

    /// Output directory, relative paths resolved against `base`.
    #[must_use]
    pub fn output_dir_in(&self, base: &Path) -> PathBuf {
        resolve(base, &self.output_dir)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = PathsConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let config = PathsConfig::default();
        assert_eq!(
            config.data_dir_in(Path::new("/study")),
            PathBuf::from("/study/data")
        );

        let absolute = PathsConfig {
            output_dir: PathBuf::from("/tmp/tlf"),
            ..Default::default()
        };
        assert_eq!(
            absolute.output_dir_in(Path::new("/study")),
            PathBuf::from("/tmp/tlf")
        );
    }
}
