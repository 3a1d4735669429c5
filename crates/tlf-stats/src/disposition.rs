//! Participant disposition: completion status and discontinuation reasons.

use std::collections::BTreeSet;

use tlf_core::{Dataset, SummaryRow, SummaryTable, TableBuilder, Value};

use crate::error::ComputationError;
use crate::groups::SubjectGroups;
use crate::params::DispositionParams;

pub const STUB: &str = "Disposition";

/// Build the disposition table from subject-level data.
///
/// # Errors
///
/// [`ComputationError::Schema`] when a configured column is missing.
pub fn compute(
    subjects: &Dataset,
    p: &DispositionParams,
) -> Result<SummaryTable, ComputationError> {
    let groups = SubjectGroups::new(subjects, &p.groups, &p.subject_var);
    if groups.eligible() == 0 {
        return Ok(SummaryTable::empty(STUB, groups.layout.columns()));
    }

    let status = subjects.require(&p.status_var)?;
    let reason = subjects.require(&p.reason_var)?;
    let completed = Value::from(p.completed_value.as_str());
    let discontinued = Value::from(p.discontinued_value.as_str());

    let mut table = TableBuilder::new(STUB, groups.layout.columns());
    table.push(SummaryRow::data(
        "Participants in population",
        0,
        groups.population_cells(),
    ));
    table.push(SummaryRow::data(
        "Completed",
        0,
        groups.pct_where(|row| *status.get(row) == completed),
    ));
    table.push(SummaryRow::data(
        "Discontinued",
        0,
        groups.pct_where(|row| *status.get(row) == discontinued),
    ));

    let reasons: BTreeSet<String> = groups
        .rows
        .iter()
        .enumerate()
        .filter(|(row, group)| group.is_some() && *status.get(*row) == discontinued)
        .map(|(row, _)| reason.get(row))
        .filter(|v| !v.is_null())
        .map(ToString::to_string)
        .collect();

    for label in reasons {
        let cells = groups.pct_where(|row| {
            *status.get(row) == discontinued && reason.get(row).to_string() == label
        });
        table.push(SummaryRow::data(label, 1, cells));
    }

    Ok(table.finish())
}
