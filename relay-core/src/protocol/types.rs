//! Wire types for the conversational agent API
//!
//! This module contains the request and response payloads exchanged with the
//! agent service. The design prioritizes:
//! - Type safety on the fields the relay and its clients actually read
//! - Forward compatibility through open maps for free-form value fields
//! - Lossless forwarding: unknown fields survive a decode/encode cycle

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of content carried by a conversation request
///
/// Unknown kinds are kept in `Other` and forwarded as sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentType {
    /// Plain text prompt
    Text,
    /// Image reference
    Image,
    /// File reference
    File,
    /// Mixed content
    Multimodal,
    Other(String),
}

impl From<String> for ContentType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "text" => ContentType::Text,
            "image" => ContentType::Image,
            "file" => ContentType::File,
            "multimodal" => ContentType::Multimodal,
            _ => ContentType::Other(value),
        }
    }
}

impl From<ContentType> for String {
    fn from(value: ContentType) -> Self {
        match value {
            ContentType::Text => "text".to_string(),
            ContentType::Image => "image".to_string(),
            ContentType::File => "file".to_string(),
            ContentType::Multimodal => "multimodal".to_string(),
            ContentType::Other(tag) => tag,
        }
    }
}

/// Protocol discriminator sent in the `from` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequestOrigin {
    /// The only value the agent API accepts
    #[default]
    #[serde(rename = "openapi")]
    OpenApi,
}

/// Value block of a request content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentValue {
    /// Text shown to the user for this turn
    pub show_text: String,

    /// Type-specific fields, forwarded unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Content of a conversation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContent {
    /// Content discriminator
    #[serde(rename = "type")]
    pub content_type: ContentType,

    /// Display text plus free-form fields
    pub value: ContentValue,

    /// Marks the opening turn of a thread
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_first_conversation: Option<bool>,

    /// Unrecognized content fields, forwarded unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Message envelope of a conversation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub content: RequestContent,

    /// Unrecognized message fields, forwarded unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Conversation request forwarded to the agent service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    /// Thread to continue; absent for a new thread
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    /// Content block
    pub message: RequestMessage,

    /// Source tag identifying the caller application
    pub source: String,

    /// Fixed protocol discriminator
    #[serde(default)]
    pub from: RequestOrigin,

    /// Caller identity token
    pub open_id: String,

    /// Unrecognized top-level fields, forwarded unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConversationRequest {
    /// Create a plain text request
    pub fn text(
        show_text: impl Into<String>,
        source: impl Into<String>,
        open_id: impl Into<String>,
    ) -> Self {
        Self {
            thread_id: None,
            message: RequestMessage {
                content: RequestContent {
                    content_type: ContentType::Text,
                    value: ContentValue {
                        show_text: show_text.into(),
                        extra: Map::new(),
                    },
                    is_first_conversation: None,
                    extra: Map::new(),
                },
                extra: Map::new(),
            },
            source: source.into(),
            from: RequestOrigin::OpenApi,
            open_id: open_id.into(),
            extra: Map::new(),
        }
    }

    /// Continue an existing thread
    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    /// Mark this request as the first turn of a thread
    pub fn first_conversation(mut self) -> Self {
        self.message.content.is_first_conversation = Some(true);
        self
    }
}

/// Routing between the two agent credential pools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRoute {
    /// Regular agent
    #[default]
    Default,
    /// "Deep thinking" agent
    DeepThinking,
}

impl AgentRoute {
    /// Map the boolean routing flag onto a route
    pub fn from_flag(deep_thinking: bool) -> Self {
        if deep_thinking {
            AgentRoute::DeepThinking
        } else {
            AgentRoute::Default
        }
    }

    /// Whether this is the deep thinking route
    pub fn is_deep_thinking(self) -> bool {
        matches!(self, AgentRoute::DeepThinking)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgentRoute::Default => "default",
            AgentRoute::DeepThinking => "deep_thinking",
        }
    }
}

/// Inbound relay body: a conversation request plus the routing flag
///
/// The flag is consumed by the relay and never forwarded upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    /// Routing flag selecting the credential pool
    #[serde(default)]
    pub is_deep_thinking: bool,

    /// Request forwarded to the agent service
    #[serde(flatten)]
    pub conversation: ConversationRequest,
}

impl RelayRequest {
    pub fn new(conversation: ConversationRequest, route: AgentRoute) -> Self {
        Self {
            is_deep_thinking: route.is_deep_thinking(),
            conversation,
        }
    }

    pub fn route(&self) -> AgentRoute {
        AgentRoute::from_flag(self.is_deep_thinking)
    }

    /// Split into the route and the upstream payload
    pub fn into_parts(self) -> (AgentRoute, ConversationRequest) {
        (AgentRoute::from_flag(self.is_deep_thinking), self.conversation)
    }
}

/// Data type of a response content chunk
///
/// Unknown tags are preserved in `Other` so new chunk kinds do not break
/// decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChunkDataType {
    Markdown,
    UiData,
    Reasoning,
    Other(String),
}

impl Default for ChunkDataType {
    fn default() -> Self {
        ChunkDataType::Other(String::new())
    }
}

impl From<String> for ChunkDataType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "markdown" => ChunkDataType::Markdown,
            "uiData" => ChunkDataType::UiData,
            "reasoning" => ChunkDataType::Reasoning,
            _ => ChunkDataType::Other(value),
        }
    }
}

impl From<ChunkDataType> for String {
    fn from(value: ChunkDataType) -> Self {
        match value {
            ChunkDataType::Markdown => "markdown".to_string(),
            ChunkDataType::UiData => "uiData".to_string(),
            ChunkDataType::Reasoning => "reasoning".to_string(),
            ChunkDataType::Other(tag) => tag,
        }
    }
}

/// Data bag of a content chunk
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChunkData {
    /// Text for markdown chunks
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub text: Option<String>,

    /// Text for reasoning chunks
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<String>,

    /// Remaining type-specific fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One content chunk of an agent message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentChunk {
    /// Empty `Other` when the agent omits the tag
    #[serde(default, deserialize_with = "lenient::data_type")]
    pub data_type: ChunkDataType,

    /// Whether this chunk is complete
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_finished: bool,

    #[serde(default, deserialize_with = "lenient::or_default")]
    pub data: ChunkData,
}

impl ContentChunk {
    /// Text carried by this chunk, if any
    pub fn text(&self) -> Option<&str> {
        match self.data_type {
            ChunkDataType::Reasoning => self.data.value.as_deref().or(self.data.text.as_deref()),
            _ => self.data.text.as_deref(),
        }
    }
}

/// Agent message payload nested in a response
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessage {
    /// Content chunks in arrival order
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub content: Vec<ContentChunk>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub thread_id: String,

    /// End of the agent turn
    #[serde(default, deserialize_with = "lenient::flag")]
    pub end_turn: bool,

    #[serde(default, deserialize_with = "lenient::string")]
    pub msg_id: String,
}

impl AgentMessage {
    /// Concatenated markdown text, in chunk order
    pub fn markdown_text(&self) -> String {
        self.collect_text(|kind| *kind == ChunkDataType::Markdown)
    }

    /// Concatenated reasoning text, in chunk order
    pub fn reasoning_text(&self) -> String {
        self.collect_text(|kind| *kind == ChunkDataType::Reasoning)
    }

    fn collect_text(&self, keep: impl Fn(&ChunkDataType) -> bool) -> String {
        self.content
            .iter()
            .filter(|chunk| keep(&chunk.data_type))
            .filter_map(ContentChunk::text)
            .collect()
    }
}

/// `data` block of a response
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseData {
    #[serde(default)]
    pub message: Option<AgentMessage>,
}

/// A decoded unit of the agent's event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationResponse {
    /// Status code; `0` means success
    pub status: i64,

    /// Human-readable status message
    #[serde(default, deserialize_with = "lenient::string")]
    pub message: String,

    /// Log correlation id
    #[serde(default, deserialize_with = "lenient::string")]
    pub logid: String,

    #[serde(default)]
    pub data: Option<ResponseData>,
}

/// Status value marking a successful response frame
pub const STATUS_OK: i64 = 0;

impl ConversationResponse {
    /// Nested agent message, if present
    pub fn agent_message(&self) -> Option<&AgentMessage> {
        self.data.as_ref().and_then(|data| data.message.as_ref())
    }

    /// Whether this response carries a deliverable message
    pub fn is_deliverable(&self) -> bool {
        self.status == STATUS_OK && self.agent_message().is_some()
    }
}

/// Tolerant readers for response fields
///
/// Only `status` and the presence of `data.message` decide whether a frame is
/// delivered, so descriptive fields accept null and non-string values instead
/// of failing the whole frame.
mod lenient {
    use super::ChunkDataType;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn text_of(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(text) => Some(text),
            other => Some(other.to_string()),
        }
    }

    pub(super) fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(text_of(Value::deserialize(deserializer)?).unwrap_or_default())
    }

    pub(super) fn opt_string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(text_of(Value::deserialize(deserializer)?))
    }

    pub(super) fn data_type<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<ChunkDataType, D::Error> {
        string(deserializer).map(ChunkDataType::from)
    }

    pub(super) fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
    }

    pub(super) fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }
}
