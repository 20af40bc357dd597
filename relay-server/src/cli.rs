//! Command line arguments of the `agent-relay` binary
//!
//! Kept out of `main.rs` so tests can build and parse them directly.

use clap::Parser;
use relay_core::config::{self, ConfigResult, ConfigValidator, RelayConfig};
use std::path::PathBuf;

/// Streaming relay between chat clients and the agent API
#[derive(Parser, Debug)]
#[command(name = "agent-relay", version, about)]
pub struct Cli {
    /// YAML or JSON configuration file; the environment is used when absent
    #[arg(long, env = "RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address, overriding the configuration
    #[arg(long)]
    pub listen: Option<String>,

    /// Enable debug logging.
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    /// Load and validate the relay configuration these arguments select
    pub fn load_config(&self) -> ConfigResult<RelayConfig> {
        let mut config = match &self.config {
            Some(path) => config::load_from_path(path)?,
            None => config::from_env()?,
        };

        if let Some(listen) = &self.listen {
            config.listen_addr = listen.clone();
            ConfigValidator::new().validate(&config)?;
        }

        Ok(config)
    }
}
