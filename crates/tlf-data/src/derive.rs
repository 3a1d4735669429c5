//! Derivation engine: applies an ordered list of steps to a dataset.
//!
//! Every step is pure. The input dataset is never modified and the same
//! input plus the same steps always produce an equal output.

use std::collections::{BTreeMap, HashSet};

use tlf_core::{AggFn, AggregateSpec, Column, DataType, Dataset, DerivationStep, Value};

use crate::describe;
use crate::error::DerivationError;
use crate::expr::CompiledExpr;

/// Apply `steps` in order, returning the derived dataset.
///
/// # Errors
///
/// The first [`DerivationError`] raised by any step.
pub fn apply(dataset: &Dataset, steps: &[DerivationStep]) -> Result<Dataset, DerivationError> {
    let mut current = dataset.clone();
    for step in steps {
        current = apply_step(&current, step)?;
    }
    tracing::trace!(
        dataset = %dataset.id(),
        steps = steps.len(),
        rows_in = dataset.row_count(),
        rows_out = current.row_count(),
        "applied derivation steps"
    );
    Ok(current)
}

/// Check what can be checked without data: expression syntax and
/// aggregate output names.
///
/// # Errors
///
/// [`DerivationError::Parse`] or [`DerivationError::InvalidStep`].
pub fn check_steps(steps: &[DerivationStep]) -> Result<(), DerivationError> {
    for step in steps {
        match step {
            DerivationStep::Filter { expr } => crate::expr::check_syntax(expr)?,
            DerivationStep::Derive { name, expr } => {
                if name.is_empty() {
                    return Err(DerivationError::InvalidStep {
                        step: "derive",
                        reason: "output name must not be empty".into(),
                    });
                }
                crate::expr::check_syntax(expr)?;
            }
            DerivationStep::Aggregate { aggs, .. } => {
                let mut names = HashSet::new();
                for agg in aggs {
                    if !names.insert(agg.name.as_str()) {
                        return Err(DerivationError::InvalidStep {
                            step: "aggregate",
                            reason: format!("duplicate output name '{}'", agg.name),
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

/// Apply a single step.
///
/// # Errors
///
/// See [`apply`].
pub fn apply_step(dataset: &Dataset, step: &DerivationStep) -> Result<Dataset, DerivationError> {
    match step {
        DerivationStep::Filter { expr } => filter(dataset, expr),
        DerivationStep::Derive { name, expr } => derive(dataset, name, expr),
        DerivationStep::Aggregate { by, aggs } => aggregate(dataset, by, aggs),
    }
}

/// Keep the rows for which `expr` is `true`. Null counts as not true.
///
/// # Errors
///
/// Compile errors, or [`DerivationError::TypeMismatch`] for a non-boolean predicate.
pub fn filter(dataset: &Dataset, expr: &str) -> Result<Dataset, DerivationError> {
    let compiled = CompiledExpr::compile(expr, dataset)?;
    if let Some(dtype) = compiled.dtype()
        && dtype != DataType::Bool
    {
        return Err(DerivationError::TypeMismatch {
            expr: expr.to_string(),
            message: format!("filter predicate must be bool, found {dtype}"),
        });
    }

    let mut keep = Vec::new();
    for row in 0..dataset.row_count() {
        if compiled.eval_row(dataset, row)? == Value::Bool(true) {
            keep.push(row);
        }
    }
    Ok(dataset.take_rows(&keep))
}

/// Add (or replace) column `name` with `expr` evaluated per row.
///
/// # Errors
///
/// Compile errors, or [`DerivationError::TypeMismatch`] when the result type
/// cannot be inferred (an expression that is always `null`).
pub fn derive(dataset: &Dataset, name: &str, expr: &str) -> Result<Dataset, DerivationError> {
    if name.is_empty() {
        return Err(DerivationError::InvalidStep {
            step: "derive",
            reason: "column name must not be empty".into(),
        });
    }
    let compiled = CompiledExpr::compile(expr, dataset)?;
    let Some(dtype) = compiled.dtype() else {
        return Err(DerivationError::TypeMismatch {
            expr: expr.to_string(),
            message: "result type cannot be inferred from a bare null".into(),
        });
    };
    let values = compiled.eval_all(dataset)?;
    let column = Column::new(name, dtype, values)?;
    Ok(dataset.with_column(column)?)
}

/// Group rows by `by` and compute one column per aggregation.
///
/// Output rows are sorted by the group key (nulls last). The output holds
/// the `by` columns followed by the aggregate columns.
///
/// # Errors
///
/// [`DerivationError::UnknownColumn`] for missing columns, and
/// [`DerivationError::InvalidStep`] for ill-formed aggregations.
pub fn aggregate(
    dataset: &Dataset,
    by: &[String],
    aggs: &[AggregateSpec],
) -> Result<Dataset, DerivationError> {
    let invalid = |reason: String| DerivationError::InvalidStep {
        step: "aggregate",
        reason,
    };
    let lookup = |name: &str| {
        dataset
            .column(name)
            .ok_or_else(|| DerivationError::UnknownColumn {
                column: name.to_string(),
            })
    };

    let keys: Vec<&Column> = by.iter().map(|b| lookup(b.as_str())).collect::<Result<_, _>>()?;

    let mut names = HashSet::new();
    for name in by.iter().chain(aggs.iter().map(|a| &a.name)) {
        if !names.insert(name.as_str()) {
            return Err(invalid(format!("output column '{name}' appears twice")));
        }
    }

    let mut inputs: Vec<Option<&Column>> = Vec::with_capacity(aggs.len());
    for spec in aggs {
        let input = match (&spec.column, spec.func) {
            (None, AggFn::Count) => None,
            (None, func) => {
                return Err(invalid(format!(
                    "'{}' uses {} which needs a column",
                    spec.name,
                    func.as_str()
                )));
            }
            (Some(column), func) => {
                let column = lookup(column.as_str())?;
                if func.needs_numeric() && !column.dtype().is_numeric() {
                    return Err(invalid(format!(
                        "'{}' applies {} to {} column '{}'",
                        spec.name,
                        func.as_str(),
                        column.dtype(),
                        column.name()
                    )));
                }
                Some(column)
            }
        };
        inputs.push(input);
    }

    let mut groups: BTreeMap<Vec<Value>, Vec<usize>> = BTreeMap::new();
    for row in 0..dataset.row_count() {
        let key = keys.iter().map(|c| c.get(row).clone()).collect();
        groups.entry(key).or_default().push(row);
    }

    let mut columns = Vec::with_capacity(keys.len() + aggs.len());
    for (position, key) in keys.iter().enumerate() {
        let values = groups.keys().map(|k| k[position].clone()).collect();
        columns.push(Column::new(key.name(), key.dtype(), values)?);
    }
    for (spec, input) in aggs.iter().zip(inputs) {
        let dtype = output_type(spec.func, input);
        let values = groups
            .values()
            .map(|rows| aggregate_group(spec.func, input, rows))
            .collect::<Result<_, _>>()?;
        columns.push(Column::new(&spec.name, dtype, values)?);
    }

    Ok(Dataset::new(dataset.id().clone(), columns)?)
}

fn output_type(func: AggFn, input: Option<&Column>) -> DataType {
    let input_type = input.map_or(DataType::Int, Column::dtype);
    match func {
        AggFn::Count | AggFn::NUnique => DataType::Int,
        AggFn::Sum if input_type == DataType::Int => DataType::Int,
        AggFn::Sum | AggFn::Mean | AggFn::Sd | AggFn::Median => DataType::Float,
        AggFn::Min | AggFn::Max => input_type,
    }
}

#[allow(clippy::cast_possible_wrap)]
fn aggregate_group(
    func: AggFn,
    input: Option<&Column>,
    rows: &[usize],
) -> Result<Value, DerivationError> {
    let Some(column) = input else {
        return Ok(Value::Int(rows.len() as i64));
    };
    let present = || {
        rows.iter()
            .map(|&r| column.get(r))
            .filter(|v| !v.is_null())
    };
    let numbers = || present().filter_map(Value::as_f64).collect::<Vec<_>>();

    let value = match func {
        AggFn::Count => Value::Int(present().count() as i64),
        AggFn::NUnique => Value::Int(present().collect::<HashSet<_>>().len() as i64),
        AggFn::Sum if column.dtype() == DataType::Int => present()
            .filter_map(|v| match v {
                Value::Int(i) => Some(*i),
                _ => None,
            })
            .try_fold(0i64, i64::checked_add)
            .map(Value::Int)
            .ok_or_else(|| DerivationError::Overflow {
                expr: format!("sum({})", column.name()),
            })?,
        AggFn::Sum => Value::Float(numbers().iter().sum()),
        AggFn::Mean => describe::mean(&numbers()).into(),
        AggFn::Sd => describe::sd(&numbers()).into(),
        AggFn::Median => describe::median(&numbers()).into(),
        AggFn::Min => present().min().cloned().unwrap_or_default(),
        AggFn::Max => present().max().cloned().unwrap_or_default(),
    };
    Ok(value)
}
