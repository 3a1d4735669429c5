//! Analysis population counts.

use tlf_core::{Dataset, SummaryRow, SummaryTable, TableBuilder};

use crate::error::ComputationError;
use crate::groups::SubjectGroups;
use crate::params::PopulationParams;

pub const STUB: &str = "Population";

/// Count subjects in each analysis population by treatment group.
///
/// Default populations whose flag column is absent are left out.
///
/// # Errors
///
/// [`ComputationError::Schema`] for a configured flag column that is missing.
pub fn compute(subjects: &Dataset, p: &PopulationParams) -> Result<SummaryTable, ComputationError> {
    let groups = SubjectGroups::new(subjects, &p.groups, &p.subject_var);
    if groups.eligible() == 0 {
        return Ok(SummaryTable::empty(STUB, groups.layout.columns()));
    }

    let mut table = TableBuilder::new(STUB, groups.layout.columns());
    table.push(SummaryRow::data(
        "Participants in population",
        0,
        groups.population_cells(),
    ));

    for pop in &p.populations {
        let flag = match subjects.column(&pop.flag_var) {
            Some(flag) => flag,
            None if !p.explicit => {
                tracing::debug!(flag = %pop.flag_var, "population flag absent, skipping");
                continue;
            }
            None => subjects.require(&pop.flag_var)?,
        };
        let cells =
            groups.pct_where(|row| flag.get(row).to_string() == pop.flag_value);
        table.push(SummaryRow::data(&pop.label, 0, cells));
    }

    Ok(table.finish())
}
