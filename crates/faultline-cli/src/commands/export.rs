//! Creation command export.

use anyhow::{Result, bail};
use faultline_config::{DeviceDefinition, FaultlineConfig};
use serde::Serialize;

#[derive(Serialize)]
struct DeviceExport {
    devices: Vec<DeviceDefinition>,
}

/// Prints the recorded devices as replayable creation commands (`json`) or
/// as `[[devices]]` declarations (`toml`).
pub fn run(config: &FaultlineConfig, format: &str) -> Result<()> {
    let (injector, _) = super::materialize(config)?;

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&injector.config_json())?;
            println!("{json}");
        }
        "toml" => {
            let export = DeviceExport {
                devices: FaultlineConfig::devices_from(&injector),
            };
            print!("{}", toml::to_string_pretty(&export)?);
        }
        other => bail!("unknown export format '{other}' (expected json or toml)"),
    }

    injector.shutdown();
    Ok(())
}
