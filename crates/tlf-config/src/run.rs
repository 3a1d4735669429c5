//! Run scheduling configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const fn default_manifest() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct RunConfig {
    /// Maximum reports processed concurrently. `0` uses the available cores.
    #[serde(default)]
    pub jobs: usize,

    /// Reports not started within this many seconds are skipped.
    #[serde(default)]
    pub deadline_secs: Option<u64>,

    /// Write `manifest.json` next to the artifacts.
    #[serde(default = "default_manifest")]
    pub manifest: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            jobs: 0,
            deadline_secs: None,
            manifest: default_manifest(),
        }
    }
}

impl RunConfig {
    /// Effective worker count.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        if self.jobs > 0 {
            return self.jobs;
        }
        std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = RunConfig::default();
        assert_eq!(config.jobs, 0);
        assert!(config.deadline().is_none());
        assert!(config.manifest);
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn explicit_jobs_win() {
        let config = RunConfig {
            jobs: 3,
            deadline_secs: Some(5),
            manifest: false,
        };
        assert_eq!(config.worker_count(), 3);
        assert_eq!(config.deadline(), Some(Duration::from_secs(5)));
    }
}
