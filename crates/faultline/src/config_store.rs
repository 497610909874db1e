//! Persisted intent for fault-injected devices.
//!
//! An entry exists for every device the operator asked to create, whether
//! or not its backend is currently present. Entries are replayed when a
//! backend of the matching name appears, and their insertion order is the
//! order in which creation commands are exported.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::FaultError;

/// One configured fault-injected device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Name of the backend device the fault-injected device is layered on.
    pub base_name: String,
    /// Fixed identity for the materialized device. Nil means "assign one".
    pub uuid: Uuid,
}

impl ConfigEntry {
    /// The fixed identity, if one was requested.
    pub fn fixed_uuid(&self) -> Option<Uuid> {
        (!self.uuid.is_nil()).then_some(self.uuid)
    }
}

/// Insertion-ordered table of [`ConfigEntry`], unique by base name.
#[derive(Debug, Default)]
pub struct ConfigStore {
    entries: Mutex<Vec<ConfigEntry>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    ///
    /// Fails with [`FaultError::AlreadyExists`] if `base_name` is present.
    pub fn add(&self, base_name: &str, uuid: Option<Uuid>) -> Result<(), FaultError> {
        let mut entries = self.entries.lock().expect("config store poisoned");
        if entries.iter().any(|e| e.base_name == base_name) {
            tracing::error!(base_name, "config entry already exists");
            return Err(FaultError::AlreadyExists {
                name: base_name.to_string(),
            });
        }
        entries
            .try_reserve(1)
            .map_err(|e| FaultError::AllocationFailure {
                reason: e.to_string(),
            })?;
        entries.push(ConfigEntry {
            base_name: base_name.to_string(),
            uuid: uuid.unwrap_or_else(Uuid::nil),
        });
        Ok(())
    }

    /// Removes an entry.
    ///
    /// Fails with [`FaultError::NotFound`] if `base_name` is absent.
    pub fn remove(&self, base_name: &str) -> Result<ConfigEntry, FaultError> {
        let mut entries = self.entries.lock().expect("config store poisoned");
        let index = entries
            .iter()
            .position(|e| e.base_name == base_name)
            .ok_or_else(|| FaultError::not_found(base_name))?;
        Ok(entries.remove(index))
    }

    pub fn find(&self, base_name: &str) -> Option<ConfigEntry> {
        self.entries
            .lock()
            .expect("config store poisoned")
            .iter()
            .find(|e| e.base_name == base_name)
            .cloned()
    }

    /// All entries in insertion order.
    pub fn list(&self) -> Vec<ConfigEntry> {
        self.entries.lock().expect("config store poisoned").clone()
    }

    pub fn clear(&self) {
        self.entries.lock().expect("config store poisoned").clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("config store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
