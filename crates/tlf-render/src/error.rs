//! Rendering error types.

use std::path::PathBuf;

/// Errors raised while rendering a table or writing its artifact.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The render spec cannot lay out the table.
    #[error("Invalid render spec: {reason}")]
    InvalidSpec { reason: String },

    /// A cell holds a value the document cannot represent.
    #[error("Unsupported statistic in row '{row}', column '{column}': {reason}")]
    UnsupportedStatistic {
        row: String,
        column: String,
        reason: String,
    },

    /// Writing the artifact failed. Any earlier file at `path` is untouched.
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
