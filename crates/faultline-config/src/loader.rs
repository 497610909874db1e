//! Configuration loader with multi-source merging

use crate::{FaultlineConfig, Paths};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    include_user_config: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "FAULTLINE".to_string(),
            include_user_config: true,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "FAULTLINE")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Skip ~/.config/faultline/config.toml
    pub fn without_user_config(mut self) -> Self {
        self.include_user_config = false;
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<FaultlineConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = FaultlineConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. User config (~/.config/faultline/config.toml)
        if self.include_user_config {
            let paths = Paths::new();
            if let Ok(user_config_file) = paths.user_config_file() {
                if user_config_file.exists() {
                    builder = builder.add_source(
                        config::File::from(user_config_file)
                            .required(false)
                            .format(config::FileFormat::Toml),
                    );
                }
            }
        }

        // 3. Project config (faultline.toml)
        let project_config_file = Paths::project_config_file(&self.project_dir);
        if project_config_file.exists() {
            builder = builder.add_source(
                config::File::from(project_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 4. Local config (faultline.local.toml, gitignored)
        let local_config_file = Paths::local_config_file(&self.project_dir);
        if local_config_file.exists() {
            builder = builder.add_source(
                config::File::from(local_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 5. Environment variables (FAULTLINE_*)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let faultline_config: FaultlineConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        faultline_config
            .validate()
            .context("Configuration failed validation")?;

        Ok(faultline_config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default(self) -> FaultlineConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline::FaultKind;
    use std::fs;
    use tempfile::tempdir;

    fn loader(dir: &Path) -> ConfigLoader {
        ConfigLoader::new()
            .with_project_dir(dir)
            .without_user_config()
    }

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = loader(temp_dir.path()).load().expect("Failed to load config");

        assert_eq!(config.logging.level, "info");
        assert!(config.devices.is_empty());
        assert!(config.faults.is_empty());
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        let config_content = r#"
[logging]
level = "debug"

[[backends]]
name = "malloc0"
block_size = 4096
num_blocks = 32

[[devices]]
base_name = "malloc0"

[[faults]]
base_name = "malloc0"
io_type = "flush"
kind = "indefinite_queue"
count = 3
queue_depth = 2
"#;
        fs::write(project_dir.join("faultline.toml"), config_content)
            .expect("Failed to write config");

        let config = loader(project_dir).load().expect("Failed to load config");

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.backends.len(), 1);
        assert_eq!(config.backends[0].block_size, 4096);
        assert_eq!(config.devices[0].base_name, "malloc0");
        assert_eq!(config.faults[0].kind, FaultKind::IndefiniteQueue);
        assert_eq!(config.faults[0].count, 3);
        assert_eq!(config.faults[0].queue_depth, 2);
    }

    #[test]
    fn test_local_overrides() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("faultline.toml"),
            r#"
[logging]
level = "info"
"#,
        )
        .expect("Failed to write project config");

        fs::write(
            project_dir.join("faultline.local.toml"),
            r#"
[logging]
level = "trace"
"#,
        )
        .expect("Failed to write local config");

        let config = loader(project_dir).load().expect("Failed to load config");

        // Local config should override project config
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_invalid_project_config_is_rejected() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("faultline.toml"),
            r#"
[[faults]]
base_name = "nowhere"
io_type = "read"
kind = "failure"
count = 1
"#,
        )
        .expect("Failed to write project config");

        assert!(loader(project_dir).load().is_err());
        assert!(loader(project_dir).load_or_default().faults.is_empty());
    }

    // Environment overrides (FAULTLINE_LOGGING_LEVEL=debug) are read from the
    // process environment, which is shared between parallel tests. They are
    // covered by the CLI integration tests instead.
}
