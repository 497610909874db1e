//! Control surface for fault-injected devices.
//!
//! The [`FaultInjector`] owns the live fault-injected devices and keeps them
//! in lockstep with the [`ConfigStore`]: creation records intent before
//! materializing, destruction removes the intent, and a backend appearing
//! later materializes whatever intent was recorded for its name.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use faultline_io::{BackendCatalog, BlockBackend, IoError};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::config_store::{ConfigEntry, ConfigStore};
use crate::disk::{ErrorDisk, disk_name};
use crate::vector::InjectOptions;
use crate::FaultError;

/// Result of a successful [`FaultInjector::create`].
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    /// The backend was present and the device is live.
    Materialized(Arc<ErrorDisk>),
    /// The backend is absent; the device will be materialized when it appears.
    Deferred,
}

/// Creates, configures and destroys fault-injected devices.
#[derive(Debug)]
pub struct FaultInjector {
    catalog: Arc<BackendCatalog>,
    config: Arc<ConfigStore>,
    /// Live devices keyed by fault-injected device name.
    disks: Mutex<BTreeMap<String, Arc<ErrorDisk>>>,
}

impl FaultInjector {
    pub fn new(catalog: Arc<BackendCatalog>, config: Arc<ConfigStore>) -> Self {
        Self {
            catalog,
            config,
            disks: Mutex::new(BTreeMap::new()),
        }
    }

    /// The backend catalog this injector materializes against.
    pub fn catalog(&self) -> &Arc<BackendCatalog> {
        &self.catalog
    }

    /// Looks up a live device by its fault-injected name (`EE_<base>`).
    pub fn disk(&self, name: &str) -> Option<Arc<ErrorDisk>> {
        self.lock_disks().get(name).cloned()
    }

    /// Names of all live devices, sorted.
    pub fn disk_names(&self) -> Vec<String> {
        self.lock_disks().keys().cloned().collect()
    }

    /// Records a fault-injected device over `base_name` and materializes it
    /// if the backend is present.
    ///
    /// A missing backend is not an error: the intent stays recorded and is
    /// replayed by [`examine`](Self::examine). Any other failure removes the
    /// recorded intent again.
    pub fn create(&self, base_name: &str, uuid: Option<Uuid>) -> Result<CreateOutcome, FaultError> {
        self.config.add(base_name, uuid)?;

        match self.materialize(base_name, uuid) {
            Ok(disk) => Ok(CreateOutcome::Materialized(disk)),
            Err(FaultError::NoSuchBackendDevice { .. }) => {
                tracing::warn!(base_name, "backend not present, creation deferred");
                Ok(CreateOutcome::Deferred)
            }
            Err(e) => {
                // The entry was added above; removal only fails if it is already gone.
                let _ = self.config.remove(base_name);
                tracing::error!(base_name, error = %e, "could not create fault-injected device");
                Err(e)
            }
        }
    }

    /// Destroys a live device and its recorded intent.
    ///
    /// `done` receives the outcome once destruction has finished.
    pub fn delete(&self, name: &str, done: impl FnOnce(Result<(), FaultError>)) {
        let removed = self.lock_disks().remove(name);
        match removed {
            Some(disk) => {
                self.destruct(&disk);
                done(Ok(()));
            }
            None => done(Err(FaultError::not_found(name))),
        }
    }

    /// Configures faults on a live device.
    pub fn inject_fault(&self, name: &str, opts: &InjectOptions) -> Result<(), FaultError> {
        opts.validate()?;
        let disks = self.lock_disks();
        let disk = disks.get(name).ok_or_else(|| {
            tracing::error!(name, "could not find fault-injected device");
            FaultError::not_found(name)
        })?;
        disk.inject(opts)
    }

    /// Registers a backend and examines it.
    pub fn add_backend(&self, backend: Arc<dyn BlockBackend>) {
        let base_name = backend.name().to_string();
        self.catalog.insert(backend);
        self.examine(&base_name);
    }

    /// Materializes the recorded device for a newly present backend, if any.
    ///
    /// Failures are logged; examination always completes.
    pub fn examine(&self, base_name: &str) {
        let Some(entry) = self.config.find(base_name) else {
            return;
        };
        if self.lock_disks().contains_key(&disk_name(base_name)) {
            return;
        }
        if let Err(e) = self.materialize(base_name, entry.fixed_uuid()) {
            tracing::error!(
                base_name,
                error = %e,
                "could not create fault-injected device at examine"
            );
        }
    }

    /// Handles removal of a backend device.
    ///
    /// The device layered over it is destroyed along with its recorded intent.
    pub fn hot_remove(&self, base_name: &str) {
        self.catalog.remove(base_name);
        let removed = self.lock_disks().remove(&disk_name(base_name));
        if let Some(disk) = removed {
            tracing::info!(device = %disk.name(), "backend hot-removed");
            self.destruct(&disk);
        }
    }

    /// Recorded devices in creation order.
    pub fn list_config(&self) -> Vec<ConfigEntry> {
        self.config.list()
    }

    /// Recorded devices as replayable creation commands.
    pub fn config_json(&self) -> Value {
        let commands = self
            .config
            .list()
            .into_iter()
            .map(|entry| {
                let mut params = json!({ "base_name": entry.base_name });
                if let Some(uuid) = entry.fixed_uuid() {
                    params["uuid"] = json!(uuid.hyphenated().to_string());
                }
                json!({ "method": "bdev_error_create", "params": params })
            })
            .collect();
        Value::Array(commands)
    }

    /// Destroys every live device and forgets all recorded intent.
    pub fn shutdown(&self) {
        let disks = std::mem::take(&mut *self.lock_disks());
        for disk in disks.values() {
            self.destruct(disk);
        }
        self.config.clear();
    }

    fn materialize(
        &self,
        base_name: &str,
        uuid: Option<Uuid>,
    ) -> Result<Arc<ErrorDisk>, FaultError> {
        let backend = self.catalog.get(base_name).map_err(|e| match e {
            IoError::NoSuchDevice { name } => FaultError::NoSuchBackendDevice { name },
            other => FaultError::from(other),
        })?;
        if backend.block_size() == 0 {
            return Err(FaultError::invalid(format!(
                "backend {base_name} reports a zero block size"
            )));
        }

        let name = disk_name(base_name);
        let mut disks = self.lock_disks();
        if disks.contains_key(&name) {
            return Err(FaultError::AlreadyExists { name });
        }
        let disk = Arc::new(ErrorDisk::new(backend, uuid));
        disks.insert(name, Arc::clone(&disk));

        tracing::info!(
            device = %disk.name(),
            uuid = %disk.uuid(),
            num_blocks = disk.num_blocks(),
            block_size = disk.block_size(),
            "fault-injected device created"
        );
        Ok(disk)
    }

    /// Tears down a device already removed from the live set.
    fn destruct(&self, disk: &ErrorDisk) {
        let aborted = disk.abort_pending();
        if let Err(e) = self.config.remove(disk.base_name()) {
            tracing::error!(device = %disk.name(), error = %e, "config entry removal failed");
        }
        tracing::info!(device = %disk.name(), aborted, "fault-injected device destroyed");
    }

    fn lock_disks(&self) -> MutexGuard<'_, BTreeMap<String, Arc<ErrorDisk>>> {
        self.disks.lock().expect("fault injector devices poisoned")
    }
}
