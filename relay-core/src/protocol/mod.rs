//! Protocol module for the agent conversation API
//!
//! This module defines the request and response payloads of the agent service
//! and the event-stream frame decoder that turns raw bytes back into typed
//! responses. The payloads are designed to be:
//! - Lossless for fields the relay does not interpret
//! - Tolerant of missing optional fields
//! - Serializable in the agent's camelCase wire format

pub mod frame;
pub mod types;

pub use frame::{DecodeStats, FrameDecoder};
pub use types::{
    AgentMessage, AgentRoute, ChunkData, ChunkDataType, ContentChunk, ContentType, ContentValue,
    ConversationRequest, ConversationResponse, RelayRequest, RequestContent, RequestMessage,
    RequestOrigin, ResponseData, STATUS_OK,
};
