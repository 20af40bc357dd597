//! Configuration validation utilities

use super::error::ValidationError;
use super::schema::RelayConfig;
use std::net::SocketAddr;
use url::Url;

/// Configuration validator with rules that go beyond the schema
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a configuration with extended rules
    pub fn validate(&self, config: &RelayConfig) -> Result<(), ValidationError> {
        // First run the built-in validation
        config.validate()?;

        self.validate_listen_addr(&config.listen_addr)?;
        self.validate_base_url(&config.agent.base_url)?;

        Ok(())
    }

    fn validate_listen_addr(&self, addr: &str) -> Result<(), ValidationError> {
        addr.parse::<SocketAddr>().map(|_| ()).map_err(|e| {
            ValidationError::invalid_format("listen_addr", e.to_string())
                .with_context("expected host:port, e.g. 0.0.0.0:3000")
        })
    }

    fn validate_base_url(&self, base_url: &str) -> Result<(), ValidationError> {
        let url = Url::parse(base_url)
            .map_err(|e| ValidationError::invalid_url("agent.base_url", e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ValidationError::invalid_url(
                "agent.base_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        if url.host_str().is_none() {
            return Err(ValidationError::invalid_url("agent.base_url", "missing host"));
        }

        if url.query().is_some() {
            return Err(ValidationError::invalid_url(
                "agent.base_url",
                "must not carry a query string",
            ));
        }

        Ok(())
    }
}
