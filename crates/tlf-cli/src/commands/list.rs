use serde::Serialize;
use tlf_config::ReportConfig;
use tlf_core::{DocumentFormat, ReportFamily};

use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::output::{Tabular, output};

#[derive(Debug, Serialize)]
struct ReportEntry {
    id: String,
    family: ReportFamily,
    inputs: String,
    format: DocumentFormat,
    title: String,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct ReportList(Vec<ReportEntry>);

impl From<&ReportConfig> for ReportEntry {
    fn from(report: &ReportConfig) -> Self {
        let inputs = report
            .inputs
            .iter()
            .map(|(role, input)| format!("{role}={}", input.dataset))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            id: report.id.clone(),
            family: report.family,
            inputs,
            format: report.render.format,
            title: report.render.title.clone(),
        }
    }
}

impl Tabular for ReportList {
    fn headers(&self) -> Vec<&'static str> {
        vec!["id", "family", "inputs", "format", "title"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.0
            .iter()
            .map(|e| {
                vec![
                    e.id.clone(),
                    e.family.to_string(),
                    e.inputs.clone(),
                    e.format.to_string(),
                    e.title.clone(),
                ]
            })
            .collect()
    }
}

/// Handle `tlf list`.
pub fn handle(flags: &GlobalFlags) -> anyhow::Result<i32> {
    let config = bootstrap::load_config(flags)?;
    let list = ReportList(config.reports.iter().map(ReportEntry::from).collect());
    output(&list, flags.format)?;
    Ok(0)
}
