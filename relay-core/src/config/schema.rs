//! Configuration schema structures with serde support

use super::error::ValidationError;
use super::secrets::SecretString;
use crate::protocol::AgentRoute;
use serde::{Deserialize, Serialize};

/// Default agent service endpoint
pub const DEFAULT_AGENT_BASE_URL: &str = "https://agentapi.baidu.com";

/// Default listen address of the relay
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

/// Root configuration structure for the relay
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Socket address the HTTP server binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Upstream agent service settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// The two credential pools
    #[serde(default)]
    pub credentials: CredentialPools,
}

/// Upstream agent service settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Scheme and host of the agent API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Connection establishment timeout in seconds
    ///
    /// The stream itself has no timeout: it lives until either side ends it.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// Credential pools selected by the routing flag
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialPools {
    /// Used when the routing flag is false
    #[serde(default)]
    pub default: CredentialPair,

    /// Used when the routing flag is true
    #[serde(default)]
    pub deep_thinking: CredentialPair,
}

/// An agent application id and its secret key
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialPair {
    #[serde(default)]
    pub app_id: Option<String>,

    #[serde(default)]
    pub secret_key: Option<SecretString>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            agent: AgentConfig::default(),
            credentials: CredentialPools::default(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_base_url() -> String { DEFAULT_AGENT_BASE_URL.to_string() }
fn default_connect_timeout() -> u64 { 10 }

impl CredentialPair {
    pub fn new(app_id: impl Into<String>, secret_key: impl Into<SecretString>) -> Self {
        Self {
            app_id: Some(app_id.into()),
            secret_key: Some(secret_key.into()),
        }
    }

    /// Application id, if present and non-blank
    pub fn app_id(&self) -> Option<&str> {
        self.app_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }

    /// Secret key, if present and non-blank
    pub fn secret_key(&self) -> Option<&SecretString> {
        self.secret_key.as_ref().filter(|key| !key.is_empty())
    }

    /// Names of the fields that are absent or blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.app_id().is_none() {
            missing.push("app_id");
        }
        if self.secret_key().is_none() {
            missing.push("secret_key");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

impl CredentialPools {
    pub fn new(default: CredentialPair, deep_thinking: CredentialPair) -> Self {
        Self {
            default,
            deep_thinking,
        }
    }

    /// Pool for a route
    pub fn for_route(&self, route: AgentRoute) -> &CredentialPair {
        match route {
            AgentRoute::Default => &self.default,
            AgentRoute::DeepThinking => &self.deep_thinking,
        }
    }
}

impl RelayConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, pair) in [
            ("default", &self.credentials.default),
            ("deep_thinking", &self.credentials.deep_thinking),
        ] {
            if let Some(field) = pair.missing_fields().first() {
                return Err(ValidationError::required(format!("credentials.{name}.{field}"))
                    .with_context("both credential pairs must be set at startup"));
            }
        }

        if self.agent.connect_timeout_secs == 0 {
            return Err(ValidationError::out_of_range(
                "agent.connect_timeout_secs",
                "must be greater than zero",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_config() -> RelayConfig {
        RelayConfig {
            credentials: CredentialPools::new(
                CredentialPair::new("app-1", "key-1"),
                CredentialPair::new("app-2", "key-2"),
            ),
            ..RelayConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
        assert_eq!(config.agent.base_url, DEFAULT_AGENT_BASE_URL);
        assert_eq!(config.agent.connect_timeout_secs, 10);
    }

    #[test]
    fn test_complete_config_validates() {
        assert!(complete_config().validate().is_ok());
    }

    #[test]
    fn test_missing_secret_reports_field_path() {
        let mut config = complete_config();
        config.credentials.deep_thinking.secret_key = Some(SecretString::new(""));

        let err = config.validate().unwrap_err();
        assert_eq!(err.field_path, "credentials.deep_thinking.secret_key");
    }

    #[test]
    fn test_blank_app_id_is_missing() {
        let pair = CredentialPair {
            app_id: Some("  ".to_string()),
            secret_key: Some(SecretString::new("k")),
        };
        assert_eq!(pair.missing_fields(), vec!["app_id"]);
        assert!(!pair.is_complete());
    }

    #[test]
    fn test_pools_by_route() {
        let config = complete_config();
        let pools = &config.credentials;
        assert_eq!(pools.for_route(AgentRoute::Default).app_id(), Some("app-1"));
        assert_eq!(pools.for_route(AgentRoute::DeepThinking).app_id(), Some("app-2"));
    }
}
