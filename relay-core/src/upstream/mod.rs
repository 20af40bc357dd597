//! Upstream connection to the agent service
//!
//! This module implements the server side of a relay session up to the point
//! where bytes start flowing:
//! - Credential selection from the routing flag
//! - Streaming request construction
//! - Status validation, with the error body read in full on failure
//!
//! The [`ConversationUpstream`] trait is the seam between the HTTP surface and
//! the agent service; [`AgentConnector`] is the production implementation.

pub mod client;

pub use client::AgentConnector;

use crate::config::{CredentialPools, SecretString};
use crate::error::{RelayError, RelayResult};
use crate::protocol::{AgentRoute, ConversationRequest};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::fmt;
use uuid::Uuid;

/// Path of the agent conversation endpoint
pub const CONVERSATION_PATH: &str = "/assistant/conversation";

/// Byte stream of an open upstream response
pub type ByteStream = BoxStream<'static, RelayResult<Bytes>>;

/// An upstream response that passed status validation
pub struct UpstreamStream {
    /// Correlation id of the relay session
    pub request_id: Uuid,
    /// Upstream HTTP status
    pub status: u16,
    /// Raw response body, not yet read
    pub body: ByteStream,
}

impl fmt::Debug for UpstreamStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamStream")
            .field("request_id", &self.request_id)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Credentials resolved for one request
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub app_id: &'a str,
    pub secret_key: &'a SecretString,
}

/// Pick the credential pair for a route
///
/// Fails with [`RelayError::Configuration`] when either half of the pair is
/// missing, so no upstream call is attempted.
pub fn select_credentials(
    pools: &CredentialPools,
    route: AgentRoute,
) -> RelayResult<Credentials<'_>> {
    let pair = pools.for_route(route);
    match (pair.app_id(), pair.secret_key()) {
        (Some(app_id), Some(secret_key)) => Ok(Credentials { app_id, secret_key }),
        _ => Err(RelayError::Configuration {
            route,
            missing: pair.missing_fields(),
        }),
    }
}

/// Source of upstream conversation streams
#[async_trait]
pub trait ConversationUpstream: Send + Sync {
    /// Open a streaming conversation on the agent service
    async fn open(
        &self,
        request: &ConversationRequest,
        route: AgentRoute,
    ) -> RelayResult<UpstreamStream>;
}
