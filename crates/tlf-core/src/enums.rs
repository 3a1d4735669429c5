//! Report families, input roles, pipeline stages and output formats.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ReportFamily
// ---------------------------------------------------------------------------

/// Category of summary table a report produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportFamily {
    Disposition,
    Population,
    Baseline,
    Efficacy,
    AeSummary,
    AeSpecific,
}

impl ReportFamily {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disposition => "disposition",
            Self::Population => "population",
            Self::Baseline => "baseline",
            Self::Efficacy => "efficacy",
            Self::AeSummary => "ae_summary",
            Self::AeSpecific => "ae_specific",
        }
    }

    /// Inputs the family cannot run without, in role order.
    ///
    /// Efficacy reads one record per subject and visit, so it asks for
    /// `observations`; a report may satisfy that with its `subjects` input.
    #[must_use]
    pub const fn required_inputs(self) -> &'static [InputRole] {
        match self {
            Self::Disposition | Self::Population | Self::Baseline => &[InputRole::Subjects],
            Self::Efficacy => &[InputRole::Observations],
            Self::AeSummary | Self::AeSpecific => &[InputRole::Subjects, InputRole::Events],
        }
    }
}

impl fmt::Display for ReportFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// InputRole
// ---------------------------------------------------------------------------

/// Role a dataset plays for a report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum InputRole {
    /// Subject-level data (one row per subject), e.g. ADSL.
    Subjects,
    /// Record-level event data, e.g. ADAE.
    Events,
    /// Record-level measurements, e.g. an efficacy endpoint dataset.
    Observations,
}

impl InputRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subjects => "subjects",
            Self::Events => "events",
            Self::Observations => "observations",
        }
    }
}

impl fmt::Display for InputRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Pipeline stage of a single report run, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Params,
    Load,
    Derive,
    Compute,
    Render,
    Write,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Params => "params",
            Self::Load => "load",
            Self::Derive => "derive",
            Self::Compute => "compute",
            Self::Render => "render",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DocumentFormat
// ---------------------------------------------------------------------------

/// Rendered document format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    /// Fixed-width plain text listing.
    #[default]
    Txt,
    /// Rich Text Format table.
    Rtf,
}

impl DocumentFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Rtf => "rtf",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
