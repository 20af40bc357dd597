//! Configuration module for the relay
//!
//! The relay needs four credential strings (two app id / secret key pairs),
//! a listen address and the agent API base URL. They are loaded once at
//! startup, validated, and then shared read-only with the upstream connector.
//! Sources are process environment variables or a YAML/JSON file with
//! `${VAR}` interpolation.

mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use env::{
    config_from_lookup, interpolate_env_vars, interpolate_with, ENV_AGENT_BASE_URL,
    ENV_DEEP_THINKING_APP_ID, ENV_DEEP_THINKING_SECRET_KEY, ENV_DEFAULT_APP_ID,
    ENV_DEFAULT_SECRET_KEY, ENV_PORT,
};
pub use error::{ConfigError, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{
    AgentConfig, CredentialPair, CredentialPools, RelayConfig, DEFAULT_AGENT_BASE_URL,
    DEFAULT_LISTEN_ADDR,
};
pub use secrets::SecretString;
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;

/// Load and validate a configuration from environment variables
pub fn from_env() -> Result<RelayConfig, ConfigError> {
    let lookup = |name: &str| std::env::var(name).ok();
    env::check_port(lookup)?;

    let config = env::config_from_env();
    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// Load a configuration from a YAML or JSON file, chosen by extension
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<RelayConfig, ConfigError> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => load_from_yaml(path),
        Some("json") => load_from_json(path),
        other => Err(ConfigError::Invalid {
            message: format!(
                "unsupported config file extension {:?} for '{}'",
                other.unwrap_or(""),
                path.display()
            ),
        }),
    }
}

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<RelayConfig, ConfigError> {
    let path = path.as_ref();
    let interpolated = read_interpolated(path)?;

    let config: RelayConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
            message: e.to_string(),
        })?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<RelayConfig, ConfigError> {
    let path = path.as_ref();
    let interpolated = read_interpolated(path)?;

    let config: RelayConfig =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

impl RelayConfig {
    /// Load and validate from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        from_env()
    }

    /// Load and validate from a YAML or JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        load_from_path(path)
    }
}

fn read_interpolated(path: &Path) -> Result<String, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;

    // Interpolate environment variables before parsing
    env::interpolate_env_vars(&content)
}
