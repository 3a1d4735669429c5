//! Per-report declarations: inputs, analysis parameters and render settings.
//!
//! Fields are typed but deliberately permissive: the parameter contract of
//! each report family is enforced when the statistics crate builds its
//! `AnalysisParameters`, so one badly parameterised report fails on its own
//! instead of invalidating the whole file.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tlf_core::{DerivationStep, DocumentFormat, InputRole, ReportFamily};

/// One report to generate.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ReportConfig {
    /// Report identifier; also the artifact file stem.
    pub id: String,

    pub family: ReportFamily,

    /// Datasets keyed by the role they play for this report.
    #[serde(default)]
    pub inputs: BTreeMap<InputRole, InputConfig>,

    #[serde(default)]
    pub params: ParamsConfig,

    #[serde(default)]
    pub render: RenderConfig,
}

impl ReportConfig {
    /// The configured input for `role`. `Observations` falls back to `Subjects`.
    #[must_use]
    pub fn input(&self, role: InputRole) -> Option<&InputConfig> {
        self.inputs.get(&role).or_else(|| match role {
            InputRole::Observations => self.inputs.get(&InputRole::Subjects),
            InputRole::Subjects | InputRole::Events => None,
        })
    }
}

/// A dataset plus the derivation steps producing the analysis subset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct InputConfig {
    /// Dataset name, resolved to a file in `paths.data_dir`.
    pub dataset: String,

    #[serde(default)]
    pub steps: Vec<DerivationStep>,
}

/// An analysis population counted by the population report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct PopulationConfig {
    pub label: String,
    /// Flag column, e.g. `ITTFL`.
    pub flag_var: String,
    #[serde(default = "default_flag_value")]
    pub flag_value: String,
}

fn default_flag_value() -> String {
    String::from("Y")
}

/// Union of the parameters recognised by every report family.
///
/// Each family reads the subset it documents and ignores the rest.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ParamsConfig {
    // ── Common ──────────────────────────────────────────────────────────
    /// Treatment column. Defaults to `TRT01P` (`TRT01A` for adverse events).
    #[serde(default)]
    pub treatment_var: Option<String>,
    /// Display order of treatment groups. Defaults to sorted distinct values.
    #[serde(default)]
    pub treatments: Option<Vec<String>>,
    /// Append a "Total" column.
    #[serde(default)]
    pub include_total: bool,
    /// Subject identifier column. Defaults to `USUBJID`.
    #[serde(default)]
    pub subject_var: Option<String>,

    // ── Disposition ─────────────────────────────────────────────────────
    #[serde(default)]
    pub status_var: Option<String>,
    #[serde(default)]
    pub completed_value: Option<String>,
    #[serde(default)]
    pub discontinued_value: Option<String>,
    #[serde(default)]
    pub reason_var: Option<String>,

    // ── Population ──────────────────────────────────────────────────────
    #[serde(default)]
    pub populations: Option<Vec<PopulationConfig>>,

    // ── Baseline ────────────────────────────────────────────────────────
    #[serde(default)]
    pub continuous: Vec<String>,
    #[serde(default)]
    pub categorical: Vec<String>,
    /// Display labels keyed by variable name.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    // ── Efficacy ────────────────────────────────────────────────────────
    #[serde(default)]
    pub response_var: Option<String>,
    #[serde(default)]
    pub covariates: Vec<String>,
    /// Reference (control) treatment group.
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub confidence_level: Option<f64>,

    // ── Adverse events ──────────────────────────────────────────────────
    #[serde(default)]
    pub related_var: Option<String>,
    #[serde(default)]
    pub related_values: Option<Vec<String>>,
    #[serde(default)]
    pub serious_var: Option<String>,
    #[serde(default)]
    pub outcome_var: Option<String>,
    #[serde(default)]
    pub fatal_value: Option<String>,
    #[serde(default)]
    pub action_var: Option<String>,
    #[serde(default)]
    pub withdrawn_value: Option<String>,
    #[serde(default)]
    pub soc_var: Option<String>,
    #[serde(default)]
    pub term_var: Option<String>,
    /// Column ordering the SOC/PT table: a treatment group or `total`.
    #[serde(default)]
    pub sort_by: Option<String>,
}

/// Document layout for a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct RenderConfig {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitles: Vec<String>,
    #[serde(default)]
    pub footnotes: Vec<String>,
    /// Character widths: stub column first, then one per group column.
    #[serde(default)]
    pub column_widths: Option<Vec<u16>>,
    #[serde(default)]
    pub format: DocumentFormat,
}
