use std::collections::BTreeMap;

use tlf_core::{Dataset, InputRole};

use crate::error::ComputationError;

/// Derived datasets handed to a computation, keyed by role.
#[derive(Debug, Clone, Default)]
pub struct AnalysisInputs {
    datasets: BTreeMap<InputRole, Dataset>,
}

impl AnalysisInputs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, role: InputRole, dataset: Dataset) -> Self {
        self.insert(role, dataset);
        self
    }

    pub fn insert(&mut self, role: InputRole, dataset: Dataset) {
        self.datasets.insert(role, dataset);
    }

    #[must_use]
    pub fn get(&self, role: InputRole) -> Option<&Dataset> {
        self.datasets.get(&role)
    }

    /// The dataset for `role`.
    ///
    /// # Errors
    ///
    /// [`ComputationError::MissingInput`] when none was supplied.
    pub fn require(&self, role: InputRole) -> Result<&Dataset, ComputationError> {
        self.get(role).ok_or(ComputationError::MissingInput { role })
    }
}
