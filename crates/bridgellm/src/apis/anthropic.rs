use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

// Messages API specific types
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessagesRole {
    User,
    #[default]
    Assistant,
}

impl MessagesRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessagesRole::User => "user",
            MessagesRole::Assistant => "assistant",
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Content blocks of an assistant message.
///
/// Any block type other than `text` and `tool_use` decodes as `Unknown`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub enum MessagesContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default = "empty_object")]
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

impl MessagesContentBlock {
    pub fn empty_text() -> Self {
        MessagesContentBlock::Text {
            text: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessagesStopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    ToolUse,
    PauseTurn,
    Refusal,
    /// Values without a known mapping are passed through unchanged.
    #[serde(untagged)]
    Other(String),
}

impl MessagesStopReason {
    /// Maps an OpenAI `finish_reason` onto the Anthropic stop reason.
    pub fn from_finish_reason(finish_reason: &str) -> Self {
        match finish_reason {
            "stop" => MessagesStopReason::EndTurn,
            "length" => MessagesStopReason::MaxTokens,
            "tool_calls" => MessagesStopReason::ToolUse,
            other => MessagesStopReason::from(other),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MessagesStopReason::EndTurn => "end_turn",
            MessagesStopReason::MaxTokens => "max_tokens",
            MessagesStopReason::StopSequence => "stop_sequence",
            MessagesStopReason::ToolUse => "tool_use",
            MessagesStopReason::PauseTurn => "pause_turn",
            MessagesStopReason::Refusal => "refusal",
            MessagesStopReason::Other(value) => value,
        }
    }
}

impl From<&str> for MessagesStopReason {
    fn from(value: &str) -> Self {
        match value {
            "end_turn" => MessagesStopReason::EndTurn,
            "max_tokens" => MessagesStopReason::MaxTokens,
            "stop_sequence" => MessagesStopReason::StopSequence,
            "tool_use" => MessagesStopReason::ToolUse,
            "pause_turn" => MessagesStopReason::PauseTurn,
            "refusal" => MessagesStopReason::Refusal,
            other => MessagesStopReason::Other(other.to_string()),
        }
    }
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagesUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    pub cache_creation_input_tokens: Option<u32>,
    pub cache_read_input_tokens: Option<u32>,
}

impl MessagesUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            cache_creation_input_tokens: None,
            cache_read_input_tokens: None,
        }
    }
}

/// A complete, non-streaming assistant message.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MessagesResponse {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub obj_type: Option<String>,
    pub role: Option<MessagesRole>,
    pub model: Option<String>,
    #[serde(default)]
    pub content: Vec<MessagesContentBlock>,
    pub stop_reason: Option<MessagesStopReason>,
    pub stop_sequence: Option<String>,
    pub usage: Option<MessagesUsage>,
}

impl TryFrom<&[u8]> for MessagesResponse {
    type Error = serde_json::Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        serde_json::from_slice(bytes)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub enum MessagesStreamEvent {
    MessageStart {
        message: MessagesStreamMessage,
    },
    ContentBlockStart {
        index: u32,
        content_block: MessagesContentBlock,
    },
    ContentBlockDelta {
        index: u32,
        delta: MessagesContentDelta,
    },
    ContentBlockStop {
        index: u32,
    },
    MessageDelta {
        delta: MessagesMessageDelta,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<MessagesUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: MessagesStreamError,
    },
}

impl MessagesStreamEvent {
    /// The SSE `event:` name for this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            MessagesStreamEvent::MessageStart { .. } => "message_start",
            MessagesStreamEvent::ContentBlockStart { .. } => "content_block_start",
            MessagesStreamEvent::ContentBlockDelta { .. } => "content_block_delta",
            MessagesStreamEvent::ContentBlockStop { .. } => "content_block_stop",
            MessagesStreamEvent::MessageDelta { .. } => "message_delta",
            MessagesStreamEvent::MessageStop => "message_stop",
            MessagesStreamEvent::Ping => "ping",
            MessagesStreamEvent::Error { .. } => "error",
        }
    }

    /// Block index for block lifecycle events.
    pub fn block_index(&self) -> Option<u32> {
        match self {
            MessagesStreamEvent::ContentBlockStart { index, .. }
            | MessagesStreamEvent::ContentBlockDelta { index, .. }
            | MessagesStreamEvent::ContentBlockStop { index } => Some(*index),
            _ => None,
        }
    }

    pub fn error(error_type: &str, message: impl Into<String>) -> Self {
        MessagesStreamEvent::Error {
            error: MessagesStreamError {
                error_type: error_type.to_string(),
                message: message.into(),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessagesStreamMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub obj_type: String,
    pub role: MessagesRole,
    pub content: Vec<Value>, // Initially empty
    pub model: String,
    pub stop_reason: Option<MessagesStopReason>,
    pub stop_sequence: Option<String>,
    pub usage: MessagesUsage,
}

impl MessagesStreamMessage {
    pub fn new(id: String, model: String, usage: MessagesUsage) -> Self {
        Self {
            id,
            obj_type: "message".to_string(),
            role: MessagesRole::Assistant,
            content: vec![],
            model,
            stop_reason: None,
            stop_sequence: None,
            usage,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum MessagesContentDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(rename = "input_json_delta")]
    InputJsonDelta { partial_json: String },
}

/// `stop_reason` and `stop_sequence` are always written, as `null` when unknown.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MessagesMessageDelta {
    pub stop_reason: Option<MessagesStopReason>,
    pub stop_sequence: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessagesStreamError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}
