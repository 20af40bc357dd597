//! Agent service connector using reqwest

use super::{
    select_credentials, ConversationUpstream, Credentials, UpstreamStream, CONVERSATION_PATH,
};
use crate::config::{CredentialPools, RelayConfig};
use crate::error::{RelayError, RelayResult};
use crate::protocol::{AgentRoute, ConversationRequest};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

/// Default user agent
const USER_AGENT: &str = concat!("agent-relay/", env!("CARGO_PKG_VERSION"));

/// Media type of the agent's streaming responses
pub const EVENT_STREAM: &str = "text/event-stream";

/// Opens streaming conversations on the agent service
///
/// Holds the credential pools read-only; one connector serves every session
/// concurrently.
#[derive(Clone)]
pub struct AgentConnector {
    /// The underlying reqwest client
    client: Client,

    /// Full URL of the conversation endpoint, without query
    endpoint: Url,

    credentials: Arc<CredentialPools>,
}

impl AgentConnector {
    /// Create a connector from a validated configuration
    ///
    /// Only connection establishment is bounded; an open stream is never
    /// timed out by the relay.
    pub fn new(config: &RelayConfig) -> RelayResult<Self> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(config.agent.connect_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RelayError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Self::with_client(client, config)
    }

    /// Create a connector around an existing client
    pub fn with_client(client: Client, config: &RelayConfig) -> RelayResult<Self> {
        let endpoint = Self::endpoint_url(&config.agent.base_url)?;
        Ok(Self {
            client,
            endpoint,
            credentials: Arc::new(config.credentials.clone()),
        })
    }

    /// Conversation endpoint this connector posts to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn endpoint_url(base_url: &str) -> RelayResult<Url> {
        let raw = format!("{}{}", base_url.trim_end_matches('/'), CONVERSATION_PATH);
        Url::parse(&raw).map_err(|e| RelayError::InvalidEndpoint(format!("{}: {}", raw, e)))
    }

    /// Build the request URL carrying the credentials as query parameters
    fn build_url(&self, credentials: Credentials<'_>) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("appId", credentials.app_id)
            .append_pair("secretKey", credentials.secret_key.expose_secret());
        url
    }
}

#[async_trait]
impl ConversationUpstream for AgentConnector {
    async fn open(
        &self,
        request: &ConversationRequest,
        route: AgentRoute,
    ) -> RelayResult<UpstreamStream> {
        let request_id = Uuid::new_v4();

        info!(
            request_id = %request_id,
            route = route.as_str(),
            thread_id = request.thread_id.as_deref().unwrap_or("-"),
            "Received conversation request"
        );

        let credentials = select_credentials(&self.credentials, route).inspect_err(|e| {
            error!("Refusing upstream call [request_id: {}]: {}", request_id, e);
        })?;

        // The URL carries the secret key and is never logged
        let url = self.build_url(credentials);

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, EVENT_STREAM)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!("Agent request failed [request_id: {}]: {}", request_id, e);
                RelayError::from(e)
            })?;

        let status = response.status();
        info!("Agent API response status: {} [request_id: {}]", status, request_id);

        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(
                        "Failed to read agent error body [request_id: {}]: {}",
                        request_id,
                        e.without_url()
                    );
                    String::new()
                }
            };

            warn!(
                "Agent API rejected request with status {} [request_id: {}]",
                status, request_id
            );
            return Err(RelayError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        if let Some(content_type) = response.headers().get(CONTENT_TYPE) {
            let content_type = content_type.to_str().unwrap_or("");
            if !content_type.starts_with(EVENT_STREAM) {
                debug!(
                    "Agent responded with {} instead of {} [request_id: {}]",
                    content_type, EVENT_STREAM, request_id
                );
            }
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| RelayError::from(e.without_url())))
            .boxed();

        Ok(UpstreamStream {
            request_id,
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CredentialPair;

    fn config(base_url: &str) -> RelayConfig {
        let mut config = RelayConfig::default();
        config.agent.base_url = base_url.to_string();
        config.credentials = CredentialPools::new(
            CredentialPair::new("app 1", "key&1"),
            CredentialPair::new("app-2", "key-2"),
        );
        config
    }

    #[test]
    fn test_endpoint_from_base_url() {
        let connector = AgentConnector::new(&config("https://agent.example/")).unwrap();
        assert_eq!(
            connector.endpoint().as_str(),
            "https://agent.example/assistant/conversation"
        );
    }

    #[test]
    fn test_build_url_encodes_credentials() {
        let connector = AgentConnector::new(&config("https://agent.example")).unwrap();
        let pools = config("https://agent.example").credentials;
        let creds = select_credentials(&pools, AgentRoute::Default).unwrap();

        let url = connector.build_url(creds);
        assert_eq!(url.query(), Some("appId=app+1&secretKey=key%261"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            AgentConnector::new(&config("not a url")),
            Err(RelayError::InvalidEndpoint(_))
        ));
    }
}
