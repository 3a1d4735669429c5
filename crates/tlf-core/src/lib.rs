//! # tlf-core
//!
//! Core types shared across all tlfkit crates:
//! - Cell values and column types
//! - Immutable datasets, dataset identity and schema requirements
//! - Summary tables and typed statistics
//! - Declarative derivation steps
//! - Report family, input role, stage and document format enums
//! - Cross-cutting schema errors

pub mod dataset;
pub mod derivation;
pub mod enums;
pub mod errors;
pub mod table;
pub mod value;

pub use dataset::{Column, Dataset, DatasetId, SchemaRequirement, TypeClass};
pub use derivation::{AggFn, AggregateSpec, DerivationStep};
pub use enums::{DocumentFormat, InputRole, ReportFamily, Stage};
pub use errors::SchemaError;
pub use table::{RowKind, Statistic, SummaryRow, SummaryTable, TableBuilder};
pub use value::{DataType, Value};
