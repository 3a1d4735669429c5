//! # tlf-stats
//!
//! Statistical computation for the six report families. Each family module
//! turns validated parameters and derived datasets into a [`SummaryTable`];
//! [`compute`] dispatches on [`AnalysisParameters`].
//!
//! Computations are pure: the same inputs and parameters give the same
//! table, and zero eligible subjects give a table with no rows rather than
//! an error.

pub mod adverse_events;
pub mod baseline;
pub mod disposition;
pub mod efficacy;
pub mod error;
pub mod groups;
pub mod inputs;
pub mod ols;
pub mod params;
pub mod population;

pub use error::ComputationError;
pub use groups::{GroupLayout, SubjectGroups, TOTAL_LABEL};
pub use inputs::AnalysisInputs;
pub use params::{
    AeSpecificParams, AeSummaryParams, AnalysisParameters, BaselineParams, DispositionParams,
    EfficacyParams, GroupSpec, PopulationDef, PopulationParams, SortColumn, Variable,
};

use tlf_core::{InputRole, SummaryTable};

/// Compute the summary table of one report.
///
/// Every input the family reads is checked against
/// [`AnalysisParameters::requirement`] before the family module runs.
///
/// # Errors
///
/// [`ComputationError::MissingInput`] for an absent role,
/// [`ComputationError::Schema`] when an input does not satisfy its
/// requirement, and whatever the family module reports.
pub fn compute(
    inputs: &AnalysisInputs,
    params: &AnalysisParameters,
) -> Result<SummaryTable, ComputationError> {
    for role in params.roles() {
        inputs.require(role)?.validate(&params.requirement(role))?;
    }

    let table = match params {
        AnalysisParameters::Disposition(p) => {
            disposition::compute(inputs.require(InputRole::Subjects)?, p)
        }
        AnalysisParameters::Population(p) => {
            population::compute(inputs.require(InputRole::Subjects)?, p)
        }
        AnalysisParameters::Baseline(p) => {
            baseline::compute(inputs.require(InputRole::Subjects)?, p)
        }
        AnalysisParameters::Efficacy(p) => {
            efficacy::compute(inputs.require(InputRole::Observations)?, p)
        }
        AnalysisParameters::AeSummary(p) => adverse_events::summary(
            inputs.require(InputRole::Subjects)?,
            inputs.require(InputRole::Events)?,
            p,
        ),
        AnalysisParameters::AeSpecific(p) => adverse_events::by_soc_pt(
            inputs.require(InputRole::Subjects)?,
            inputs.require(InputRole::Events)?,
            p,
        ),
    }?;

    tracing::debug!(
        family = %params.family(),
        rows = table.rows().len(),
        "computed summary table"
    );
    Ok(table)
}
