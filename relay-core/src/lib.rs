//! Agent Relay Core Library
//!
//! Streaming relay between chat clients and a hosted conversational agent:
//! - [`upstream`]: credential routing and the streaming call to the agent
//! - [`relay`]: verbatim byte relay bound to one session
//! - [`protocol`]: wire types and the event-stream frame decoder
//! - [`client`]: cancellable consumer of a relayed stream
//! - [`config`]: startup configuration from the environment or a file

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod upstream;

pub use client::{ConversationClient, StreamConsumer};
pub use config::RelayConfig;
pub use error::{ClientError, RelayError, RelayResult};
pub use protocol::{AgentRoute, ConversationRequest, ConversationResponse, FrameDecoder};
pub use relay::{RelayStream, StreamSession};
pub use upstream::{AgentConnector, ConversationUpstream};

/// Returns the version of the Agent Relay Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
