//! Configuration management for Faultline
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (FAULTLINE_* prefix, highest precedence)
//! 2. faultline.local.toml (gitignored, local overrides)
//! 3. faultline.toml (git-tracked, project config)
//! 4. ~/.config/faultline/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! A configuration declares fault-injected devices, the faults to inject
//! into them, and in-memory backends to materialize them against for a
//! dry run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use faultline::{CreateOutcome, FaultInjector, FaultKind, InjectOptions, InjectTarget, disk_name};
use faultline_io::MemBackend;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main Faultline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultlineConfig {
    pub logging: LoggingConfig,
    pub backends: Vec<BackendDefinition>,
    pub devices: Vec<DeviceDefinition>,
    pub faults: Vec<FaultDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive; `RUST_LOG` takes precedence.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// In-memory backend used when materializing a configuration for a dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDefinition {
    pub name: String,
    #[serde(default = "default_block_size")]
    pub block_size: u32,
    pub num_blocks: u64,
}

fn default_block_size() -> u32 {
    512
}

/// Largest in-memory backend a plan may declare, in bytes.
pub const MAX_BACKEND_BYTES: u64 = 1 << 30;

/// Fault-injected device to create over a named backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDefinition {
    pub base_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
}

/// Fault injection applied to a declared device once it exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultDefinition {
    /// Backend name of the target device.
    pub base_name: String,
    pub io_type: InjectTarget,
    #[serde(default)]
    pub kind: FaultKind,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub queue_depth: u64,
    #[serde(default)]
    pub corrupt_offset: u64,
    #[serde(default)]
    pub corrupt_value: u8,
}

impl FaultDefinition {
    pub fn inject_options(&self) -> InjectOptions {
        InjectOptions::new(self.io_type, self.kind, self.count)
            .with_queue_depth(self.queue_depth)
            .with_corruption(self.corrupt_offset, self.corrupt_value)
    }
}

/// What [`FaultlineConfig::apply`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Devices live after applying.
    pub materialized: Vec<String>,
    /// Devices recorded but waiting for their backend.
    pub deferred: Vec<String>,
    /// Fault injections applied to live devices.
    pub faults_applied: usize,
    /// Fault injections skipped because their device is not live.
    pub faults_skipped: usize,
}

impl FaultlineConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Parse a single TOML file without layering or environment overrides
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadError {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::ParseError { path, source })
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut backends = HashSet::new();
        for backend in &self.backends {
            if !backends.insert(backend.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "backend {} is declared more than once",
                    backend.name
                )));
            }
            if backend.block_size == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "backend {} has a zero block size",
                    backend.name
                )));
            }
            let bytes = u64::from(backend.block_size).checked_mul(backend.num_blocks);
            if bytes.is_none_or(|bytes| bytes > MAX_BACKEND_BYTES) {
                return Err(ConfigError::ValidationError(format!(
                    "backend {} exceeds the {MAX_BACKEND_BYTES} byte in-memory limit",
                    backend.name
                )));
            }
        }

        let mut devices = HashSet::new();
        for device in &self.devices {
            if !devices.insert(device.base_name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "device over {} is declared more than once",
                    device.base_name
                )));
            }
        }

        for fault in &self.faults {
            if !devices.contains(fault.base_name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "fault targets undeclared device {}",
                    fault.base_name
                )));
            }
            fault.inject_options().validate().map_err(|e| {
                ConfigError::ValidationError(format!("fault on {}: {e}", fault.base_name))
            })?;
        }
        Ok(())
    }

    /// Materializes the configuration: registers the declared in-memory
    /// backends, creates the declared devices and injects the declared faults.
    pub fn apply(&self, injector: &FaultInjector) -> Result<ApplyReport> {
        self.validate()?;

        for backend in &self.backends {
            let mem =
                MemBackend::try_new(backend.name.clone(), backend.block_size, backend.num_blocks)
                    .with_context(|| format!("Failed to allocate backend {}", backend.name))?;
            injector.add_backend(Arc::new(mem));
        }

        let mut report = ApplyReport::default();
        for device in &self.devices {
            let name = disk_name(&device.base_name);
            match injector
                .create(&device.base_name, device.uuid)
                .with_context(|| format!("Failed to create device over {}", device.base_name))?
            {
                CreateOutcome::Materialized(_) => report.materialized.push(name),
                CreateOutcome::Deferred => report.deferred.push(name),
            }
        }

        for fault in &self.faults {
            let name = disk_name(&fault.base_name);
            if injector.disk(&name).is_none() {
                report.faults_skipped += 1;
                continue;
            }
            injector
                .inject_fault(&name, &fault.inject_options())
                .with_context(|| format!("Failed to inject fault into {name}"))?;
            report.faults_applied += 1;
        }
        Ok(report)
    }

    /// The device declarations equivalent to an injector's recorded intent
    pub fn devices_from(injector: &FaultInjector) -> Vec<DeviceDefinition> {
        injector
            .list_config()
            .into_iter()
            .map(|entry| DeviceDefinition {
                uuid: entry.fixed_uuid(),
                base_name: entry.base_name,
            })
            .collect()
    }
}
