//! HTTP surface of the agent relay
//!
//! Routes:
//! - `POST /api/conversation`: open an agent conversation and stream it back
//! - `GET /health`: liveness probe
//!
//! Failures before the stream starts are answered with a JSON error body and
//! the matching status. Once the event-stream headers are out, a failure only
//! closes the connection.

pub mod cli;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::{HeaderName, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use relay_core::config::RelayConfig;
use relay_core::protocol::RelayRequest;
use relay_core::relay::RelayStream;
use relay_core::upstream::{AgentConnector, ConversationUpstream};
use relay_core::{RelayError, RelayResult};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

/// Relay path of the conversation endpoint
pub const CONVERSATION_ROUTE: &str = "/api/conversation";

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    upstream: Arc<dyn ConversationUpstream>,
}

impl AppState {
    pub fn new(upstream: impl ConversationUpstream + 'static) -> Self {
        Self {
            upstream: Arc::new(upstream),
        }
    }

    /// State backed by the agent service described in `config`
    pub fn from_config(config: &RelayConfig) -> RelayResult<Self> {
        Ok(Self::new(AgentConnector::new(config)?))
    }
}

/// A [`RelayError`] answered as a JSON error body
#[derive(Debug)]
pub struct ApiError(pub RelayError);

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        debug!("Answering relay request with {}: {}", status, self.0);
        (status, Json(self.0.to_body())).into_response()
    }
}

/// Build the relay router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(CONVERSATION_ROUTE, post(conversation))
        .route("/health", get(health))
        .layer(middleware::from_fn(log_request))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the relay on a bound listener until the server fails
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}

async fn conversation(
    State(state): State<AppState>,
    payload: Result<Json<RelayRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| RelayError::InvalidRequest(e.body_text()))?;
    let (route, conversation) = request.into_parts();

    let upstream = state.upstream.open(&conversation, route).await?;
    let body = Body::from_stream(RelayStream::from_upstream(upstream, route));

    Ok((
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache"),
            (CONNECTION, "keep-alive"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        body,
    )
        .into_response())
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    info!("{} {}", request.method(), request.uri().path());
    next.run(request).await
}
