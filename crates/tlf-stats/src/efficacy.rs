//! ANCOVA of a continuous endpoint.
//!
//! Model: `y = β0 + Σ τk·I(arm = k) + Σ γj·xj + ε`, fit by OLS on complete
//! cases with the reference arm as baseline level. LS means are evaluated
//! at the covariate means of the analysed rows. Comparisons against the
//! reference use Student t with `n - p` degrees of freedom.

use ndarray::{Array1, Array2};
use statrs::distribution::{ContinuousCDF, StudentsT};
use tlf_core::{Column, Dataset, Statistic, SummaryRow, SummaryTable, TableBuilder};
use tlf_data::{describe, round_half_away};

use crate::error::ComputationError;
use crate::groups::GroupLayout;
use crate::ols;
use crate::params::EfficacyParams;

pub const STUB: &str = "Statistic";

/// Fit the ANCOVA and build the efficacy table.
///
/// # Errors
///
/// [`ComputationError::InsufficientData`] when the reference arm has no
/// complete cases or the model has no residual variance, and
/// [`ComputationError::SingularDesign`] when the design is rank deficient.
pub fn compute(
    observations: &Dataset,
    p: &EfficacyParams,
) -> Result<SummaryTable, ComputationError> {
    let trt = observations.require(&p.groups.var)?;
    let response = observations.require(&p.response_var)?;
    let covariates: Vec<&Column> = p
        .covariates
        .iter()
        .map(|c| observations.require(c))
        .collect::<Result<_, _>>()?;

    let layout = GroupLayout::resolve(&p.groups, Some(trt));
    let arms = layout.len();

    // Complete cases: (arm, response, covariates)
    let mut cases: Vec<(usize, f64, Vec<f64>)> = Vec::new();
    for row in 0..observations.row_count() {
        let Some(arm) = layout.index_of(trt.get(row)) else {
            continue;
        };
        let Some(y) = response.get(row).as_f64() else {
            continue;
        };
        let x: Option<Vec<f64>> = covariates.iter().map(|c| c.get(row).as_f64()).collect();
        if let Some(x) = x {
            cases.push((arm, y, x));
        }
    }

    if cases.is_empty() {
        return Ok(SummaryTable::empty(STUB, layout.columns()));
    }

    let mut by_arm: Vec<Vec<f64>> = vec![Vec::new(); arms];
    for (arm, y, _) in &cases {
        by_arm[*arm].push(*y);
    }

    let reference = layout
        .labels()
        .iter()
        .position(|l| *l == p.reference)
        .filter(|&r| !by_arm[r].is_empty())
        .ok_or_else(|| ComputationError::InsufficientData {
            reason: format!("reference arm '{}' has no complete observations", p.reference),
        })?;

    // Design columns: intercept, one indicator per non-reference arm with
    // data, then covariates.
    let modeled: Vec<usize> = (0..arms)
        .filter(|&a| a != reference && !by_arm[a].is_empty())
        .collect();
    let indicator = |arm: usize| modeled.iter().position(|&m| m == arm);
    let width = 1 + modeled.len() + covariates.len();

    let covariate_at = 1 + modeled.len();
    let mut x = Array2::<f64>::zeros((cases.len(), width));
    let mut y = Array1::<f64>::zeros(cases.len());
    for (i, (arm, yi, xi)) in cases.iter().enumerate() {
        let mut row = x.row_mut(i);
        row[0] = 1.0;
        if let Some(k) = indicator(*arm) {
            row[1 + k] = 1.0;
        }
        for (j, value) in xi.iter().enumerate() {
            row[covariate_at + j] = *value;
        }
        y[i] = *yi;
    }

    let fit = ols::fit(&x, &y)?;
    if fit.sigma2() <= 0.0 {
        return Err(ComputationError::InsufficientData {
            reason: "model has zero residual variance".into(),
        });
    }

    #[allow(clippy::cast_precision_loss)]
    let df = fit.df() as f64;
    let t = StudentsT::new(0.0, 1.0, df).map_err(|e| ComputationError::InsufficientData {
        reason: format!("t distribution with {df} df: {e}"),
    })?;
    let quantile = t.inverse_cdf(1.0 - (1.0 - p.confidence_level) / 2.0);

    let covariate_means: Vec<f64> = (0..covariates.len())
        .map(|j| {
            let column: Vec<f64> = cases.iter().map(|(_, _, xi)| xi[j]).collect();
            describe::mean(&column).unwrap_or(0.0)
        })
        .collect();

    let mut ls_means = vec![Statistic::Empty; arms];
    let mut diffs = vec![Statistic::Empty; arms];
    let mut intervals = vec![Statistic::Empty; arms];
    let mut p_values = vec![Statistic::Empty; arms];

    for arm in (0..arms).filter(|&a| !by_arm[a].is_empty()) {
        let mut l = Array1::<f64>::zeros(width);
        l[0] = 1.0;
        if let Some(k) = indicator(arm) {
            l[1 + k] = 1.0;
        }
        for (j, mean) in covariate_means.iter().enumerate() {
            l[covariate_at + j] = *mean;
        }
        let (value, se) = fit.contrast(l.view());
        ls_means[arm] = Statistic::Estimate { value, se };

        if let Some(k) = indicator(arm) {
            let mut l = Array1::<f64>::zeros(width);
            l[1 + k] = 1.0;
            let (diff, se) = fit.contrast(l.view());
            diffs[arm] = Statistic::Estimate { value: diff, se };
            intervals[arm] = Statistic::Interval {
                lower: quantile.mul_add(-se, diff),
                upper: quantile.mul_add(se, diff),
                level: p.confidence_level,
            };
            p_values[arm] = Statistic::PValue {
                p: 2.0 * t.sf((diff / se).abs()),
            };
        }
    }

    tracing::debug!(
        n = fit.n,
        parameters = fit.p,
        sigma2 = fit.sigma2(),
        "fitted ANCOVA"
    );

    let mut samples = by_arm;
    if layout.has_total() {
        samples.push(samples.concat());
    }
    let n_cells = samples
        .iter()
        .map(|s| Statistic::Count { n: s.len() as u64 })
        .collect();
    let mean_cells = samples
        .iter()
        .map(|s| match describe::mean(s) {
            Some(mean) => Statistic::MeanSd {
                mean: round_half_away(mean, 1),
                sd: describe::sd(s).map(|sd| round_half_away(sd, 2)),
            },
            None => Statistic::Empty,
        })
        .collect();

    let mut table = TableBuilder::new(STUB, layout.columns());
    table
        .push(SummaryRow::data("n", 0, n_cells))
        .push(SummaryRow::data("Mean (SD)", 0, mean_cells))
        .push(SummaryRow::data("LS Mean (SE)", 0, ls_means))
        .blank()
        .header(format!("Difference from {}", p.reference))
        .push(SummaryRow::data("LS Mean Difference (SE)", 1, diffs))
        .push(SummaryRow::data(
            format!("{}% CI", round_half_away(p.confidence_level * 100.0, 1)),
            1,
            intervals,
        ))
        .push(SummaryRow::data("p-value", 1, p_values));

    Ok(table.finish())
}

#[cfg(test)]
mod tests {
    use tlf_core::{DataType, DatasetId, Value};

    use super::*;
    use crate::params::GroupSpec;

    fn observations(rows: &[(&str, Option<f64>, f64)]) -> Dataset {
        let ids = rows
            .iter()
            .enumerate()
            .map(|(i, _)| Value::from(format!("S{i}")))
            .collect();
        Dataset::new(
            DatasetId::new("adeff", "0"),
            vec![
                Column::new("USUBJID", DataType::Str, ids).expect("col"),
                Column::new(
                    "TRT01P",
                    DataType::Str,
                    rows.iter().map(|r| Value::from(r.0)).collect(),
                )
                .expect("col"),
                Column::new(
                    "CHG",
                    DataType::Float,
                    rows.iter().map(|r| Value::from(r.1)).collect(),
                )
                .expect("col"),
                Column::new(
                    "BASE",
                    DataType::Float,
                    rows.iter().map(|r| Value::from(r.2)).collect(),
                )
                .expect("col"),
            ],
        )
        .expect("dataset")
    }

    fn params(covariates: &[&str]) -> EfficacyParams {
        EfficacyParams {
            groups: GroupSpec {
                var: "TRT01P".into(),
                order: Some(vec!["Placebo".into(), "Drug".into()]),
                include_total: false,
            },
            subject_var: "USUBJID".into(),
            response_var: "CHG".into(),
            covariates: covariates.iter().map(ToString::to_string).collect(),
            reference: "Placebo".into(),
            confidence_level: 0.95,
        }
    }

    fn row<'a>(table: &'a SummaryTable, label: &str) -> &'a SummaryRow {
        table
            .rows()
            .iter()
            .find(|r| r.label == label)
            .unwrap_or_else(|| panic!("no row '{label}'"))
    }

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn two_arm_difference_matches_t_test() {
        let data = observations(&[
            ("Placebo", Some(1.0), 0.0),
            ("Placebo", Some(2.0), 0.0),
            ("Placebo", Some(3.0), 0.0),
            ("Drug", Some(4.0), 0.0),
            ("Drug", Some(5.0), 0.0),
            ("Drug", Some(6.0), 0.0),
        ]);
        let table = compute(&data, &params(&[])).expect("compute");
        assert_eq!(table.columns, vec!["Placebo", "Drug"]);

        let Statistic::Estimate { value, se } = row(&table, "LS Mean Difference (SE)").cells[1]
        else {
            panic!("expected estimate");
        };
        assert!(close(value, 3.0, 1e-9));
        assert!(close(se, (2.0_f64 / 3.0).sqrt(), 1e-9));

        let Statistic::Interval { lower, upper, .. } = row(&table, "95% CI").cells[1] else {
            panic!("expected interval");
        };
        assert!(close(lower, 0.733, 1e-3));
        assert!(close(upper, 5.267, 1e-3));

        let Statistic::PValue { p } = row(&table, "p-value").cells[1] else {
            panic!("expected p-value");
        };
        assert!(close(p, 0.0213, 1e-3));

        assert_eq!(row(&table, "p-value").cells[0], Statistic::Empty);
        let Statistic::Estimate { value, se } = row(&table, "LS Mean (SE)").cells[0] else {
            panic!("expected estimate");
        };
        assert!(close(value, 2.0, 1e-9));
        assert!(close(se, (1.0_f64 / 3.0).sqrt(), 1e-9));
    }

    #[test]
    fn incomplete_cases_are_dropped() {
        let data = observations(&[
            ("Placebo", Some(1.0), 0.0),
            ("Placebo", None, 0.0),
            ("Placebo", Some(3.0), 0.0),
            ("Drug", Some(4.0), 0.0),
            ("Drug", Some(6.0), 0.0),
        ]);
        let table = compute(&data, &params(&[])).expect("compute");
        assert_eq!(
            row(&table, "n").cells,
            vec![Statistic::Count { n: 2 }, Statistic::Count { n: 2 }]
        );
    }

    #[test]
    fn collinear_covariate_is_singular() {
        // BASE is constant, so it duplicates the intercept.
        let data = observations(&[
            ("Placebo", Some(1.0), 5.0),
            ("Placebo", Some(2.0), 5.0),
            ("Drug", Some(4.0), 5.0),
            ("Drug", Some(6.0), 5.0),
        ]);
        assert!(matches!(
            compute(&data, &params(&["BASE"])),
            Err(ComputationError::SingularDesign { .. })
        ));
    }

    #[test]
    fn reference_without_data_is_insufficient() {
        let data = observations(&[
            ("Drug", Some(4.0), 0.0),
            ("Drug", Some(5.0), 0.0),
            ("Drug", Some(6.0), 0.0),
        ]);
        assert!(matches!(
            compute(&data, &params(&[])),
            Err(ComputationError::InsufficientData { .. })
        ));
    }

    #[test]
    fn no_observations_gives_empty_table() {
        let data = observations(&[]);
        let table = compute(&data, &params(&[])).expect("compute");
        assert!(table.rows().is_empty());
        assert_eq!(table.columns, vec!["Placebo", "Drug"]);
    }
}
