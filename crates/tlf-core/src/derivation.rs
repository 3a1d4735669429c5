//! Declarative derivation steps.
//!
//! Steps are written in the report configuration and executed in order by
//! `tlf-data`. Expressions are kept as source text here; parsing and type
//! checking happen in the derivation engine.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One transformation applied to a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DerivationStep {
    /// Keep rows where `expr` evaluates to `true`.
    Filter { expr: String },
    /// Add (or replace) column `name` with the value of `expr` per row.
    Derive { name: String, expr: String },
    /// Group by `by` and compute one output column per aggregation.
    Aggregate {
        by: Vec<String>,
        aggs: Vec<AggregateSpec>,
    },
}

/// Aggregation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AggFn {
    /// Rows in the group, or its non-null values of `column` when one is given.
    Count,
    /// Number of distinct non-null values.
    NUnique,
    Sum,
    Mean,
    /// Sample standard deviation (n - 1).
    Sd,
    Median,
    Min,
    Max,
}

impl AggFn {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::NUnique => "n_unique",
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Sd => "sd",
            Self::Median => "median",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Whether the function needs a numeric input column.
    #[must_use]
    pub const fn needs_numeric(self) -> bool {
        matches!(self, Self::Sum | Self::Mean | Self::Sd | Self::Median)
    }
}

/// Output column `name` = `func(column)` per group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AggregateSpec {
    pub name: String,
    pub func: AggFn,
    #[serde(default)]
    pub column: Option<String>,
}
