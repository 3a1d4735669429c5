//! Computation error types.

use tlf_core::{InputRole, ReportFamily, SchemaError};

/// Errors raised while building parameters or computing a summary table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComputationError {
    /// A parameter the report family cannot default is not configured.
    #[error("{family} report needs parameter '{param}'")]
    MissingParameter {
        family: ReportFamily,
        param: &'static str,
    },

    /// A configured parameter has an unusable value.
    #[error("Invalid parameter '{param}': {reason}")]
    InvalidParameter { param: &'static str, reason: String },

    /// The report has no dataset for a role its family needs.
    #[error("No '{role}' input configured")]
    MissingInput { role: InputRole },

    /// Data is present but too little to estimate the model.
    #[error("Insufficient data: {reason}")]
    InsufficientData { reason: String },

    /// The model design matrix is rank deficient.
    #[error("Singular design: {reason}")]
    SingularDesign { reason: String },

    /// A required column is absent or has the wrong type.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}
