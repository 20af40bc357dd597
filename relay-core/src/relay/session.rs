//! Lifetime state of one relay session

use crate::protocol::AgentRoute;
use std::fmt;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

/// How a relay session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Upstream finished and every byte was handed downstream
    Completed,
    /// Upstream failed mid-stream
    UpstreamFailed,
    /// Downstream went away before the upstream finished
    Disconnected,
    /// The session token was cancelled
    Cancelled,
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionOutcome::Completed => "completed",
            SessionOutcome::UpstreamFailed => "upstream_failed",
            SessionOutcome::Disconnected => "disconnected",
            SessionOutcome::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Pairing of one upstream and one downstream connection
///
/// Ending the session cancels its token, so anything holding a clone of the
/// token observes the end of either side.
#[derive(Debug)]
pub struct StreamSession {
    id: Uuid,
    route: AgentRoute,
    token: CancellationToken,
    started: Instant,
    bytes: u64,
    chunks: u64,
    outcome: Option<SessionOutcome>,
}

impl StreamSession {
    pub fn new(id: Uuid, route: AgentRoute) -> Self {
        Self::with_token(id, route, CancellationToken::new())
    }

    /// Create a session driven by an existing token
    pub fn with_token(id: Uuid, route: AgentRoute, token: CancellationToken) -> Self {
        Self {
            id,
            route,
            token,
            started: Instant::now(),
            bytes: 0,
            chunks: 0,
            outcome: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn route(&self) -> AgentRoute {
        self.route
    }

    /// Token cancelled when the session ends or should end
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Request the session to stop
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn record_chunk(&mut self, len: usize) {
        self.bytes += len as u64;
        self.chunks += 1;
    }

    pub fn bytes_relayed(&self) -> u64 {
        self.bytes
    }

    pub fn chunks_relayed(&self) -> u64 {
        self.chunks
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Record the end of the session; only the first call has an effect
    pub fn finish(&mut self, outcome: SessionOutcome) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        self.outcome = Some(outcome);
        self.token.cancel();

        info!(
            request_id = %self.id,
            route = self.route.as_str(),
            outcome = %outcome,
            bytes = self.bytes,
            chunks = self.chunks,
            elapsed_ms = self.elapsed().as_millis() as u64,
            "Relay session ended"
        );
        true
    }
}
