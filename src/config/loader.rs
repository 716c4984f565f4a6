//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Command-line values that replace their config fields.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_port: Option<u16>,
    pub project_id: Option<String>,
    pub project_secret: Option<String>,
}

/// Apply `overrides` and validate again, so flags face the same checks as
/// file values.
pub fn apply_overrides(
    mut config: ProxyConfig,
    overrides: Overrides,
) -> Result<ProxyConfig, ConfigError> {
    if let Some(port) = overrides.base_port {
        config.listener.base_port = port;
    }
    if overrides.project_id.is_some() {
        config.upstream.project_id = overrides.project_id;
    }
    if overrides.project_secret.is_some() {
        config.upstream.project_secret = overrides.project_secret;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
