//! Client side of the relay
//!
//! [`ConversationClient`] posts a conversation to a relay and hands back a
//! [`StreamConsumer`] that decodes the event stream lazily. Each client is
//! bound to one agent route for its lifetime.

pub mod consumer;

pub use consumer::{ConsumerState, StreamConsumer};

use crate::error::ClientError;
use crate::protocol::{AgentRoute, ConversationRequest, RelayRequest};
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Relay address used when none is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Relay path of the conversation endpoint
pub const CONVERSATION_ENDPOINT: &str = "/api/conversation";

/// Raw body of a relay response
pub type ResponseStream = BoxStream<'static, Result<Bytes, reqwest::Error>>;

/// Client for a relay's conversation endpoint
#[derive(Debug, Clone)]
pub struct ConversationClient {
    client: Client,
    base_url: String,
    route: AgentRoute,
}

impl Default for ConversationClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ConversationClient {
    /// Client for the default agent
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, AgentRoute::Default)
    }

    /// Client for the deep thinking agent
    pub fn deep_thinking(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, AgentRoute::DeepThinking)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, route: AgentRoute) -> Self {
        let base_url = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            route,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn route(&self) -> AgentRoute {
        self.route
    }

    /// Start a conversation and return its message stream
    ///
    /// `cancel` is observed while the request is in flight and before every
    /// read of the stream.
    pub async fn conversation_stream(
        &self,
        request: ConversationRequest,
        cancel: CancellationToken,
    ) -> Result<StreamConsumer<ResponseStream>, ClientError> {
        let url = format!("{}{}", self.base_url, CONVERSATION_ENDPOINT);
        let body = RelayRequest::new(request, self.route);

        debug!("Posting conversation to {} (route: {})", url, self.route.as_str());

        let send = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .json(&body)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            response = send => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Relay answered with status {}: {}", status, body);
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(StreamConsumer::new(response.bytes_stream().boxed(), cancel))
    }
}
