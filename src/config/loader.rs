//! Configuration loading from disk and environment.

use std::path::Path;
use std::fs;
use thiserror::Error;
use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Upstream base URL.
pub const ENV_UPSTREAM_URL: &str = "FLASK_API_URL";
/// Listening port.
pub const ENV_PORT: &str = "PORT";
/// Staging directory for uploads.
pub const ENV_UPLOAD_DIR: &str = "UPLOAD_DIR";
/// Comma-separated CORS allow-list.
pub const ENV_CORS_ORIGINS: &str = "CORS_ALLOWED_ORIGINS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {key}: {value}")]
    Env { key: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file into a configuration without validating it.
pub fn read_config_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let config = read_config_file(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Build the process configuration: file (or defaults), then the
/// environment, then validation.
pub fn load_from_env(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply overrides from a variable lookup. Unset variables leave the
/// configuration untouched.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_UPSTREAM_URL) {
        config.upstream.base_url = url.trim().trim_end_matches('/').to_string();
    }

    if let Some(port) = lookup(ENV_PORT) {
        let parsed: u16 = port.trim().parse().map_err(|_| ConfigError::Env {
            key: ENV_PORT,
            value: port.clone(),
        })?;
        config.listener.set_port(parsed);
    }

    if let Some(dir) = lookup(ENV_UPLOAD_DIR) {
        config.uploads.dir = dir;
    }

    if let Some(origins) = lookup(ENV_CORS_ORIGINS) {
        config.security.cors.allowed_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
    }

    Ok(())
}
