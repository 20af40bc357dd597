//! Error types for the relay and its client
//!
//! Server side failures are [`RelayError`]s; each maps to an HTTP status and
//! a JSON body the relay sends before any event-stream header goes out. Once
//! streaming has started, failures only close the connection.
//!
//! Client side failures are [`ClientError`]s. Cancellation is one of them so
//! it travels the same channel, but it is an expected outcome and callers can
//! tell it apart with [`ClientError::is_cancelled`].

use crate::protocol::AgentRoute;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors raised while opening a relay session
#[derive(Debug, Error)]
pub enum RelayError {
    /// Credentials for the selected route are absent
    #[error("Missing credentials for {} route: {}", .route.as_str(), .missing.join(", "))]
    Configuration {
        route: AgentRoute,
        missing: Vec<&'static str>,
    },

    /// The agent answered with a non-success status
    #[error("Agent API request failed with status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    /// The configured agent base URL does not form a valid endpoint
    #[error("Invalid agent endpoint: {0}")]
    InvalidEndpoint(String),

    /// The agent could not be reached or the exchange broke
    #[error("Transport error: {0}")]
    Transport(String),

    /// The inbound body could not be read as a relay request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// JSON body sent for a failed relay request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    pub details: String,
}

impl RelayError {
    /// HTTP status the relay answers with
    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::Configuration { .. } => 500,
            RelayError::UpstreamStatus { status, .. } => *status,
            RelayError::InvalidEndpoint(_) => 500,
            RelayError::Transport(_) => 500,
            RelayError::InvalidRequest(_) => 400,
        }
    }

    /// JSON error body for this failure
    pub fn to_body(&self) -> ErrorBody {
        match self {
            RelayError::Configuration { route, missing } => ErrorBody {
                error: "Missing required credentials".to_string(),
                status: None,
                details: format!(
                    "Check the {} credential configuration ({})",
                    route.as_str(),
                    missing.join(", ")
                ),
            },
            RelayError::UpstreamStatus { status, body } => ErrorBody {
                error: "Agent API request failed".to_string(),
                status: Some(*status),
                details: body.clone(),
            },
            RelayError::InvalidEndpoint(message) => ErrorBody {
                error: "Invalid agent configuration".to_string(),
                status: None,
                details: message.clone(),
            },
            RelayError::Transport(message) => ErrorBody {
                error: "Internal Server Error".to_string(),
                status: None,
                details: message.clone(),
            },
            RelayError::InvalidRequest(message) => ErrorBody {
                error: "Invalid request body".to_string(),
                status: None,
                details: message.clone(),
            },
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            RelayError::Transport(format!("Connection failed: {}", err))
        } else if err.is_timeout() {
            RelayError::Transport(format!("Connection timed out: {}", err))
        } else {
            RelayError::Transport(err.to_string())
        }
    }
}

/// Errors surfaced by the conversation client
#[derive(Debug, Error)]
pub enum ClientError {
    /// The caller cancelled the stream
    #[error("Stream cancelled by caller")]
    Cancelled,

    /// The relay answered with a non-success status
    #[error("HTTP error! status: {status}")]
    Status { status: u16, body: String },

    /// Reading the stream failed
    #[error("Stream transport error: {0}")]
    Transport(String),

    /// The request could not be built or sent
    #[error("Request error: {0}")]
    Request(String),
}

impl ClientError {
    /// Whether this is the expected cancellation outcome
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Request(err.to_string())
    }
}
