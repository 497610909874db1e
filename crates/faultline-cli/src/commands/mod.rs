//! CLI command implementations.

pub mod check;
pub mod export;
pub mod simulate;
pub mod version;

use std::sync::Arc;

use anyhow::Result;
use faultline::{ConfigStore, FaultInjector};
use faultline_config::{ApplyReport, FaultlineConfig};
use faultline_io::BackendCatalog;

/// Builds a fresh injector and applies `config` to it.
pub(crate) fn materialize(config: &FaultlineConfig) -> Result<(FaultInjector, ApplyReport)> {
    let injector = FaultInjector::new(
        Arc::new(BackendCatalog::new()),
        Arc::new(ConfigStore::new()),
    );
    let report = config.apply(&injector)?;
    Ok((injector, report))
}
