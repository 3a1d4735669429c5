//! Explicit per-run dataset cache.
//!
//! Owned by the run orchestrator and shared by reference between workers.
//! Each dataset name is loaded at most once per successful load; failures are
//! not cached so every report that needs a broken dataset sees the error.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tlf_core::{Dataset, DatasetId};

use crate::error::DataError;
use crate::loader::DatasetLoader;

#[derive(Debug)]
pub struct DatasetCache {
    loader: DatasetLoader,
    entries: Mutex<HashMap<String, Arc<Dataset>>>,
}

impl DatasetCache {
    #[must_use]
    pub fn new(loader: DatasetLoader) -> Self {
        Self {
            loader,
            entries: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn loader(&self) -> &DatasetLoader {
        &self.loader
    }

    /// Return the cached dataset, loading it on first use.
    ///
    /// The lock is not held while reading the file. Two workers racing on the
    /// same name may both load it; the first insert wins and both observe
    /// equal data.
    ///
    /// # Errors
    ///
    /// Propagates [`DataError`] from the loader.
    pub fn get(&self, name: &str) -> Result<Arc<Dataset>, DataError> {
        if let Some(hit) = self.lock().get(name) {
            tracing::trace!(dataset = name, "dataset cache hit");
            return Ok(Arc::clone(hit));
        }

        let loaded = Arc::new(self.loader.load(name)?);
        let mut entries = self.lock();
        let entry = entries.entry(name.to_string()).or_insert(loaded);
        Ok(Arc::clone(entry))
    }

    /// Identities of every dataset loaded so far, sorted by name.
    #[must_use]
    pub fn loaded(&self) -> Vec<DatasetId> {
        let mut ids: Vec<DatasetId> = self.lock().values().map(|d| d.id().clone()).collect();
        ids.sort_by(|a, b| a.name.cmp(&b.name));
        ids
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Dataset>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
