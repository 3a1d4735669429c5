//! Cross-cutting error types.
//!
//! Dataset shape errors are raised by the loader, the derivation engine and
//! the statistics modules alike, so they live here. Stage-specific errors
//! (`DataError`, `DerivationError`, `ComputationError`, `RenderError`) are
//! defined in their own crates and converge in `tlf-cli`.

use thiserror::Error;

/// A dataset does not have the shape a consumer requires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("dataset '{dataset}' has no column '{column}'")]
    MissingColumn { dataset: String, column: String },

    #[error("column '{column}' has type {found}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    #[error("column '{column}' has unsupported storage type {found}")]
    UnsupportedType { column: String, found: String },

    #[error("duplicate column '{column}'")]
    DuplicateColumn { column: String },

    #[error("column '{column}' has {found} rows, expected {expected}")]
    RaggedColumns {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("dataset '{dataset}' key column '{column}' has duplicate value '{value}'")]
    DuplicateKey {
        dataset: String,
        column: String,
        value: String,
    },
}
