use crate::apis::anthropic::MessagesStreamEvent;
use crate::clients::TransformError;
use bytes::Bytes;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DONE_MARKER: &str = "[DONE]";

// ============================================================================
// SSE EVENT CONTAINER
// ============================================================================

/// One outgoing Server-Sent Event frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    /// The `event:` name, e.g. `content_block_delta`
    pub event: String,
    /// The JSON payload written after `data: `
    pub data: Value,
}

impl SseEvent {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Encode a run of stream events, in order.
    pub fn from_events<'a>(
        events: impl IntoIterator<Item = &'a MessagesStreamEvent>,
    ) -> Result<Vec<SseEvent>, TransformError> {
        events.into_iter().map(SseEvent::try_from).collect()
    }

    /// Whether nothing may follow this frame on the wire.
    pub fn is_terminal(&self) -> bool {
        self.event == "message_stop" || self.event == "error"
    }
}

impl TryFrom<&MessagesStreamEvent> for SseEvent {
    type Error = TransformError;

    fn try_from(event: &MessagesStreamEvent) -> Result<Self, Self::Error> {
        Ok(SseEvent {
            event: event.event_type().to_string(),
            data: serde_json::to_value(event)?,
        })
    }
}

impl fmt::Display for SseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event: {}\ndata: {}\n\n", self.event, self.data)
    }
}

impl From<SseEvent> for Bytes {
    fn from(event: SseEvent) -> Self {
        Bytes::from(event.to_string())
    }
}

// ============================================================================
// UPSTREAM LINE PARSING
// ============================================================================

/// A meaningful line of an upstream SSE transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    Event(String),
    Data(String),
}

impl SseLine {
    /// Check if this line is the `[DONE]` sentinel
    pub fn is_done(&self) -> bool {
        matches!(self, SseLine::Data(data) if data == DONE_MARKER)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("SSE parse error: {message}")]
pub struct SseParseError {
    pub message: String,
}

impl FromStr for SseLine {
    type Err = SseParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let trimmed_line = line.trim();

        // Blank lines separate events
        if trimmed_line.is_empty() {
            return Err(SseParseError {
                message: "Empty line (SSE event separator)".to_string(),
            });
        }

        if let Some(data) = trimmed_line.strip_prefix("data:") {
            let data = data.trim();
            if data.is_empty() {
                return Err(SseParseError {
                    message: "Empty data field after 'data:' prefix".to_string(),
                });
            }
            Ok(SseLine::Data(data.to_string()))
        } else if let Some(event_type) = trimmed_line.strip_prefix("event:") {
            let event_type = event_type.trim();
            if event_type.is_empty() {
                return Err(SseParseError {
                    message: "Empty event field is not a valid SSE event".to_string(),
                });
            }
            Ok(SseLine::Event(event_type.to_string()))
        } else {
            // Comments (": keep-alive"), id:, retry: and anything else
            Err(SseParseError {
                message: format!(
                    "Line does not start with 'data:' or 'event:': {}",
                    trimmed_line
                ),
            })
        }
    }
}

/// Generic SSE (Server-Sent Events) streaming iterator container
/// Parses raw SSE lines into `SseLine` values, stopping after `[DONE]`.
pub struct SseStreamIter<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    pub lines: I,
    pub done_seen: bool,
}

impl<I> SseStreamIter<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    pub fn new(lines: I) -> Self {
        Self {
            lines,
            done_seen: false,
        }
    }
}

impl TryFrom<&[u8]> for SseStreamIter<std::vec::IntoIter<String>> {
    type Error = std::str::Utf8Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let s = std::str::from_utf8(bytes)?;
        let lines: Vec<String> = s.lines().map(|line| line.to_string()).collect();
        Ok(SseStreamIter::new(lines.into_iter()))
    }
}

impl<I> Iterator for SseStreamIter<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = SseLine;

    fn next(&mut self) -> Option<Self::Item> {
        // If we already returned [DONE], terminate the stream
        if self.done_seen {
            return None;
        }

        for line in &mut self.lines {
            if let Ok(parsed) = line.as_ref().parse::<SseLine>() {
                if parsed.is_done() {
                    self.done_seen = true;
                }
                return Some(parsed);
            }
        }
        None
    }
}
