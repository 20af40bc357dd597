//! Environment variable handling for configuration

use super::error::{ConfigError, ValidationError};
use super::schema::{CredentialPair, CredentialPools, RelayConfig};
use super::secrets::SecretString;
use regex::Regex;
use std::sync::LazyLock;

/// App id of the default agent
pub const ENV_DEFAULT_APP_ID: &str = "VITE_BAIDU_APP_ID";
/// Secret key of the default agent
pub const ENV_DEFAULT_SECRET_KEY: &str = "VITE_BAIDU_SECRET_KEY";
/// App id of the deep thinking agent
pub const ENV_DEEP_THINKING_APP_ID: &str = "VITE_DEEPSEEKR1";
/// Secret key of the deep thinking agent
pub const ENV_DEEP_THINKING_SECRET_KEY: &str = "VITE_DEEPSEEKR1_KEY";
/// Listen port, bound on all interfaces
pub const ENV_PORT: &str = "PORT";
/// Optional override of the agent API base URL
pub const ENV_AGENT_BASE_URL: &str = "AGENT_BASE_URL";

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is a valid regex")
});

/// Interpolate `${VAR}` references in a configuration string
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    interpolate_with(content, |name| std::env::var(name).ok())
}

/// Interpolate `${VAR}` references using a custom lookup
pub fn interpolate_with(
    content: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    let mut missing = None;
    let result = ENV_VAR_PATTERN.replace_all(content, |cap: &regex::Captures<'_>| {
        let var_name = &cap[1];
        lookup(var_name).unwrap_or_else(|| {
            missing.get_or_insert_with(|| var_name.to_string());
            String::new()
        })
    });

    // Report the first missing variable
    if let Some(var) = missing {
        return Err(ConfigError::EnvVarNotFound { var });
    }

    Ok(result.into_owned())
}

/// Build a configuration from process environment variables
///
/// Absent credentials are left unset here; validation reports them.
pub fn config_from_env() -> RelayConfig {
    config_from_lookup(|name| std::env::var(name).ok())
}

/// Build a configuration from a variable lookup
pub fn config_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RelayConfig {
    let pair = |app_var: &str, key_var: &str| CredentialPair {
        app_id: lookup(app_var),
        secret_key: lookup(key_var).map(SecretString::from),
    };

    let mut config = RelayConfig {
        credentials: CredentialPools::new(
            pair(ENV_DEFAULT_APP_ID, ENV_DEFAULT_SECRET_KEY),
            pair(ENV_DEEP_THINKING_APP_ID, ENV_DEEP_THINKING_SECRET_KEY),
        ),
        ..RelayConfig::default()
    };

    if let Some(port) = lookup(ENV_PORT) {
        config.listen_addr = format!("0.0.0.0:{}", port.trim());
    }
    if let Some(base_url) = lookup(ENV_AGENT_BASE_URL) {
        config.agent.base_url = base_url;
    }

    config
}

/// Parse the `PORT` variable on its own, for a precise error
pub(crate) fn check_port(lookup: impl Fn(&str) -> Option<String>) -> Result<(), ValidationError> {
    match lookup(ENV_PORT) {
        Some(port) => port
            .trim()
            .parse::<u16>()
            .map(|_| ())
            .map_err(|e| ValidationError::invalid_format(ENV_PORT, e.to_string())),
        None => Ok(()),
    }
}
