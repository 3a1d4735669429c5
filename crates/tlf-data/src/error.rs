//! Data-layer error types.

use std::path::PathBuf;

use tlf_core::SchemaError;

/// Errors raised while locating or reading a dataset.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// No source file exists for the dataset name.
    #[error("Dataset not found: '{name}' in {}", dir.display())]
    NotFound {
        /// Requested dataset name.
        name: String,
        /// Directory that was searched.
        dir: PathBuf,
    },

    /// The file was read but its shape is unusable.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// `DuckDB` failed to scan a parquet file.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// Arrow IPC decoding failed.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// I/O error reading the source file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the derivation engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DerivationError {
    #[error("Cannot parse expression '{expr}' at offset {offset}: {message}")]
    Parse {
        expr: String,
        offset: usize,
        message: String,
    },

    #[error("Unknown column '{column}'")]
    UnknownColumn { column: String },

    #[error("Unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("Type mismatch in '{expr}': {message}")]
    TypeMismatch { expr: String, message: String },

    #[error("Arithmetic overflow evaluating '{expr}'")]
    Overflow { expr: String },

    #[error("Invalid {step} step: {reason}")]
    InvalidStep { step: &'static str, reason: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
