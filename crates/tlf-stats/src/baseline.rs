//! Baseline characteristics.
//!
//! Continuous variables get `n`, `Mean (SD)` and `Median [Min, Max]` rows;
//! categorical variables one `n (%)` row per category in first-appearance
//! order. Statistics are rounded here (mean, median, min and max to one
//! decimal, SD to two, halves away from zero) so the rendered digits match.

use tlf_core::{Column, Dataset, Statistic, SummaryRow, SummaryTable, TableBuilder, Value};
use tlf_data::{describe, round_half_away};

use crate::error::ComputationError;
use crate::groups::SubjectGroups;
use crate::params::BaselineParams;

pub const STUB: &str = "Characteristic";

/// Build the baseline characteristics table.
///
/// # Errors
///
/// [`ComputationError::Schema`] when a variable column is missing.
pub fn compute(subjects: &Dataset, p: &BaselineParams) -> Result<SummaryTable, ComputationError> {
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

    for var in &p.continuous {
        let column = subjects.require(&var.name)?;
        table.header(&var.label);
        for row in continuous_rows(&groups, column) {
            table.push(row);
        }
    }

    for var in &p.categorical {
        let column = subjects.require(&var.name)?;
        table.header(&var.label);

        let categories: Vec<Value> = column
            .distinct_in_order()
            .into_iter()
            .filter(|category| {
                groups
                    .rows
                    .iter()
                    .zip(column.values())
                    .any(|(g, v)| g.is_some() && v == category)
            })
            .collect();
        for category in categories {
            let cells = groups.pct_where(|row| *column.get(row) == category);
            table.push(SummaryRow::data(category.to_string(), 1, cells));
        }
    }

    Ok(table.finish())
}

fn continuous_rows(groups: &SubjectGroups, column: &Column) -> [SummaryRow; 3] {
    let mut samples: Vec<Vec<f64>> = vec![Vec::new(); groups.layout.len()];
    for (row, group) in groups.rows.iter().enumerate() {
        if let (Some(g), Some(v)) = (group, column.get(row).as_f64()) {
            samples[*g].push(v);
        }
    }
    if groups.layout.has_total() {
        samples.push(samples.concat());
    }

    let n = samples
        .iter()
        .map(|s| Statistic::Count { n: s.len() as u64 })
        .collect();
    let mean_sd = samples
        .iter()
        .map(|s| match describe::mean(s) {
            Some(mean) => Statistic::MeanSd {
                mean: round_half_away(mean, 1),
                sd: describe::sd(s).map(|sd| round_half_away(sd, 2)),
            },
            None => Statistic::Empty,
        })
        .collect();
    let median_range = samples
        .iter()
        .map(|s| match (describe::median(s), describe::min(s), describe::max(s)) {
            (Some(median), Some(min), Some(max)) => Statistic::MedianRange {
                median: round_half_away(median, 1),
                min: round_half_away(min, 1),
                max: round_half_away(max, 1),
            },
            _ => Statistic::Empty,
        })
        .collect();

    [
        SummaryRow::data("n", 1, n),
        SummaryRow::data("Mean (SD)", 1, mean_sd),
        SummaryRow::data("Median [Min, Max]", 1, median_range),
    ]
}
