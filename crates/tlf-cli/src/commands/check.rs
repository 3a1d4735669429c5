use anyhow::Context;
use serde::Serialize;
use tlf_config::ReportConfig;
use tlf_core::ReportFamily;
use tlf_data::derive;
use tlf_render::RenderSpec;
use tlf_stats::AnalysisParameters;

use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::output::{Tabular, output};

#[derive(Debug, Serialize)]
struct CheckEntry {
    id: String,
    family: ReportFamily,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct CheckReport(Vec<CheckEntry>);

impl Tabular for CheckReport {
    fn headers(&self) -> Vec<&'static str> {
        vec!["id", "family", "status", "error"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.0
            .iter()
            .map(|e| {
                vec![
                    e.id.clone(),
                    e.family.to_string(),
                    e.status.to_string(),
                    e.error.clone().unwrap_or_default(),
                ]
            })
            .collect()
    }
}

/// Everything about a report that can be checked without reading data.
fn check_report(report: &ReportConfig) -> anyhow::Result<()> {
    AnalysisParameters::build(report).context("parameters")?;
    RenderSpec::from(&report.render)
        .check()
        .context("render settings")?;
    for (role, input) in &report.inputs {
        derive::check_steps(&input.steps)
            .with_context(|| format!("derivation steps of input '{role}'"))?;
    }
    Ok(())
}

/// Handle `tlf check`. Exits 1 when any report is invalid.
pub fn handle(flags: &GlobalFlags) -> anyhow::Result<i32> {
    let config = bootstrap::load_config(flags)?;
    let entries: Vec<CheckEntry> = config
        .reports
        .iter()
        .map(|report| {
            let error = check_report(report).err().map(|e| format!("{e:#}"));
            CheckEntry {
                id: report.id.clone(),
                family: report.family,
                status: if error.is_some() { "error" } else { "ok" },
                error,
            }
        })
        .collect();

    let failed = entries.iter().filter(|e| e.error.is_some()).count();
    output(&CheckReport(entries), flags.format)?;
    Ok(i32::from(failed > 0))
}
