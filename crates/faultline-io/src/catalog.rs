//! Name-indexed registry of backend devices.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::{BlockBackend, IoError};

/// The set of backend devices currently present, keyed by name.
#[derive(Default)]
pub struct BackendCatalog {
    backends: RwLock<BTreeMap<String, Arc<dyn BlockBackend>>>,
}

impl BackendCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a backend, replacing any previous one of the same name.
    pub fn insert(&self, backend: Arc<dyn BlockBackend>) {
        let name = backend.name().to_string();
        self.backends
            .write()
            .expect("backend catalog poisoned")
            .insert(name, backend);
    }

    /// Removes a backend, returning it if it was present.
    pub fn remove(&self, name: &str) -> Option<Arc<dyn BlockBackend>> {
        self.backends
            .write()
            .expect("backend catalog poisoned")
            .remove(name)
    }

    /// Looks up a backend by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn BlockBackend>, IoError> {
        self.backends
            .read()
            .expect("backend catalog poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| IoError::NoSuchDevice {
                name: name.to_string(),
            })
    }

    /// Names of all registered backends, sorted.
    pub fn names(&self) -> Vec<String> {
        self.backends
            .read()
            .expect("backend catalog poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for BackendCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendCatalog")
            .field("backends", &self.names())
            .finish()
    }
}
