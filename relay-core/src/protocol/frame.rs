//! Event-stream frame decoding
//!
//! The agent streams responses as blank-line delimited frames:
//!
//! ```text
//! event:message
//! data:{"status":0,"data":{"message":{...}}}
//!
//! ```
//!
//! [`FrameDecoder`] accepts raw byte chunks of any size, reassembles frames
//! across chunk boundaries (including split multi-byte characters) and yields
//! only the responses a caller should see. Frames themselves never leave this
//! module.

use super::types::ConversationResponse;
use tracing::{debug, warn};

/// Separator between two frames
pub const FRAME_DELIMITER: &str = "\n\n";

/// Event label of frames carrying conversation responses
pub const MESSAGE_EVENT: &str = "message";

const EVENT_PREFIX: &str = "event:";
const DATA_PREFIX: &str = "data:";

/// Counters describing what a decoder has seen so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Complete frames split off the buffer
    pub frames: u64,
    /// Responses handed to the caller
    pub messages: u64,
    /// Frames with another event label or without a data line
    pub ignored: u64,
    /// Message frames whose data line was not valid JSON
    pub malformed: u64,
    /// Well-formed responses with a non-zero status or no nested message
    pub rejected: u64,
    /// Bytes left in the buffer when the stream ended
    pub discarded_bytes: u64,
}

/// One delimited unit of the wire format
struct Frame<'a> {
    event: &'a str,
    data: Option<&'a str>,
}

impl<'a> Frame<'a> {
    fn parse(raw: &'a str) -> Self {
        let mut lines = raw.split('\n');
        let label = lines.next().unwrap_or_default().trim_start();
        let event = label.strip_prefix(EVENT_PREFIX).unwrap_or(label).trim();
        let data = lines.next().and_then(|line| line.strip_prefix(DATA_PREFIX));
        Self { event, data }
    }
}

/// Incremental decoder from raw bytes to conversation responses
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Decoded text not yet terminated by a delimiter
    buffer: String,
    /// Incomplete UTF-8 sequence carried over from the previous chunk
    utf8_tail: Vec<u8>,
    stats: DecodeStats,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes and return the responses it completed
    ///
    /// The text after the last delimiter stays buffered until a later chunk
    /// terminates it.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<ConversationResponse> {
        self.push_bytes(chunk);

        if !self.buffer.contains(FRAME_DELIMITER) {
            return Vec::new();
        }

        let buffer = std::mem::take(&mut self.buffer);
        let mut frames: Vec<&str> = buffer.split(FRAME_DELIMITER).collect();
        let rest = frames.pop().unwrap_or_default();

        let mut messages = Vec::new();
        for raw in frames {
            self.stats.frames += 1;
            if let Some(message) = self.decode_frame(raw) {
                messages.push(message);
            }
        }

        self.buffer = rest.to_string();
        self.stats.messages += messages.len() as u64;
        messages
    }

    /// End of stream: drop whatever is still buffered
    ///
    /// The agent always terminates frames before closing the stream, so a
    /// leftover is never parsed. Returns the number of bytes discarded.
    pub fn finish(&mut self) -> usize {
        let discarded = self.buffer.len() + self.utf8_tail.len();
        if discarded > 0 {
            debug!(
                "Discarding {} unterminated bytes at end of event stream",
                discarded
            );
        }
        self.buffer.clear();
        self.utf8_tail.clear();
        self.stats.discarded_bytes += discarded as u64;
        discarded
    }

    /// Number of bytes waiting for a delimiter
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() + self.utf8_tail.len()
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    fn decode_frame(&mut self, raw: &str) -> Option<ConversationResponse> {
        let frame = Frame::parse(raw);

        let payload = match frame.data {
            Some(payload) if frame.event == MESSAGE_EVENT => payload,
            _ => {
                self.stats.ignored += 1;
                return None;
            }
        };

        let response = match serde_json::from_str::<ConversationResponse>(payload) {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to parse response data: {}", e);
                self.stats.malformed += 1;
                return None;
            }
        };

        if !response.is_deliverable() {
            self.stats.rejected += 1;
            return None;
        }

        Some(response)
    }

    /// Append a chunk to the text buffer, holding back a split character
    fn push_bytes(&mut self, chunk: &[u8]) {
        let joined;
        let mut input: &[u8] = if self.utf8_tail.is_empty() {
            chunk
        } else {
            let mut tail = std::mem::take(&mut self.utf8_tail);
            tail.extend_from_slice(chunk);
            joined = tail;
            &joined
        };

        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&input[..valid]) {
                        self.buffer.push_str(text);
                    }
                    match e.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            input = &input[valid + len..];
                        }
                        None => {
                            self.utf8_tail = input[valid..].to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }
}
