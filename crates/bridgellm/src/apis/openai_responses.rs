use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use std::collections::HashMap;

use crate::apis::openai::ToolCall;

impl TryFrom<&[u8]> for ResponsesAPIRequest {
    type Error = serde_json::Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        serde_json::from_slice(bytes)
    }
}

impl TryFrom<&[u8]> for ResponsesAPIResponse {
    type Error = serde_json::Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        serde_json::from_slice(bytes)
    }
}

// ============================================================================
// Request Structs - CreateResponse
// ============================================================================

/// Request to create a model response
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponsesAPIRequest {
    /// The model to use for generating the response
    #[serde(default)]
    pub model: String,

    /// Text or item inputs to the model
    #[serde(default)]
    pub input: InputParam,

    /// A system (or developer) message inserted into the model's context
    pub instructions: Option<String>,

    /// Tools available to the model
    pub tools: Option<Vec<ResponsesTool>>,

    /// Tool choice option
    pub tool_choice: Option<ResponsesToolChoice>,

    /// Whether to allow the model to run tool calls in parallel
    pub parallel_tool_calls: Option<bool>,

    /// If set to true, the client expects the response as a stream
    pub stream: Option<bool>,

    /// Maximum number of output tokens
    pub max_output_tokens: Option<u32>,

    /// Temperature for sampling (0-2)
    pub temperature: Option<f32>,

    /// Top-p nucleus sampling parameter
    pub top_p: Option<f32>,

    /// User identifier
    pub user: Option<String>,

    /// Metadata for the response
    pub metadata: Option<HashMap<String, Value>>,
}

/// Input parameter - can be a simple string or array of input items
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputParam {
    /// Simple text input
    Text(String),
    /// Array of input items (messages, function calls, tool outputs)
    Items(Vec<InputItem>),
}

impl Default for InputParam {
    fn default() -> Self {
        InputParam::Items(Vec::new())
    }
}

impl InputParam {
    pub fn is_empty(&self) -> bool {
        match self {
            InputParam::Text(text) => text.trim().is_empty(),
            InputParam::Items(items) => items.is_empty(),
        }
    }
}

/// One entry of `input[]` (or of a response's `output[]`).
///
/// Items are decoded by their `type` tag first; a tagless object with a `role`
/// is a message, and anything else is kept as raw JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum InputItem {
    Typed(ResponsesItem),
    Bare(ItemMessage),
    Other(Value),
}

/// Borrowed view of an input item with the bare-message form folded in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemRef<'a> {
    Message(&'a ItemMessage),
    FunctionCall(&'a FunctionCallItem),
    FunctionCallOutput(&'a FunctionCallOutputItem),
    Unknown(&'a Value),
}

impl InputItem {
    pub fn view(&self) -> ItemRef<'_> {
        match self {
            InputItem::Typed(ResponsesItem::Message(message)) | InputItem::Bare(message) => {
                ItemRef::Message(message)
            }
            InputItem::Typed(ResponsesItem::FunctionCall(call)) => ItemRef::FunctionCall(call),
            InputItem::Typed(ResponsesItem::FunctionCallOutput(output)) => {
                ItemRef::FunctionCallOutput(output)
            }
            InputItem::Other(value) => ItemRef::Unknown(value),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsesItem {
    Message(ItemMessage),
    #[serde(alias = "tool_call")]
    FunctionCall(FunctionCallItem),
    #[serde(alias = "tool_result", alias = "tool_message")]
    FunctionCallOutput(FunctionCallOutputItem),
}

/// Input message with role and content
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemMessage {
    pub role: MessageRole,
    #[serde(default)]
    pub content: Option<ItemContent>,
}

/// Message roles
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Developer,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
            MessageRole::Developer => "developer",
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FunctionCallItem {
    pub id: Option<String>,
    pub call_id: Option<String>,
    pub name: Option<String>,
    /// JSON text (possibly encoded twice) or an already-decoded object.
    pub arguments: Option<Value>,
    pub status: Option<String>,
}

impl FunctionCallItem {
    /// The id tool results refer back to: `call_id`, falling back to `id`.
    pub fn call_id(&self) -> Option<&str> {
        self.call_id
            .as_deref()
            .or(self.id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FunctionCallOutputItem {
    pub id: Option<String>,
    pub call_id: Option<String>,
    pub tool_call_id: Option<String>,
    pub tool_use_id: Option<String>,
    pub text: Option<String>,
    pub content: Option<ItemContent>,
    pub output: Option<Value>,
}

impl FunctionCallOutputItem {
    /// First explicit id carried by the item itself.
    pub fn explicit_call_id(&self) -> Option<&str> {
        [
            &self.call_id,
            &self.tool_call_id,
            &self.tool_use_id,
            &self.id,
        ]
        .into_iter()
        .filter_map(|id| id.as_deref())
        .find(|id| !id.is_empty())
    }
}

/// Message or tool-result content: a string, an array of parts, or a part
/// object that nests its text under `text` or `content`.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ItemContent {
    Text(String),
    Parts(Vec<ItemContent>),
    Block {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        content: Option<Box<ItemContent>>,
    },
    Other(Value),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ResponsesTool {
    /// Chat Completions shape: `{type, function: {name, parameters}}`
    Nested {
        #[serde(rename = "type", default)]
        tool_type: Option<String>,
        function: FunctionDeclaration,
    },
    /// Responses shape: `{type, name, parameters}`
    Flat {
        #[serde(rename = "type")]
        tool_type: String,
        #[serde(flatten)]
        declaration: Option<FunctionDeclaration>,
    },
    Other(Value),
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: Option<String>,
    pub parameters: Option<Value>,
    pub strict: Option<bool>,
}

impl ResponsesTool {
    /// The function declaration, if this is a function tool.
    pub fn function(&self) -> Option<&FunctionDeclaration> {
        match self {
            ResponsesTool::Nested {
                tool_type,
                function,
            } if tool_type.as_deref().unwrap_or("function") == "function" => Some(function),
            ResponsesTool::Flat {
                tool_type,
                declaration: Some(declaration),
            } if tool_type == "function" => Some(declaration),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            ResponsesTool::Nested { tool_type, .. } => tool_type.as_deref().unwrap_or("function"),
            ResponsesTool::Flat { tool_type, .. } => tool_type,
            ResponsesTool::Other(value) => value
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown"),
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ResponsesToolChoice {
    /// `"auto"`, `"none"`, `"required"`
    Mode(String),
    Named {
        #[serde(rename = "type")]
        choice_type: String,
        name: Option<String>,
        function: Option<NamedFunction>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedFunction {
    pub name: String,
}

// ============================================================================
// Response Structs
// ============================================================================

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponsesAPIResponse {
    /// Unique identifier for this Response
    pub id: String,

    /// The object type - always "response"
    pub object: String,

    /// Unix timestamp (in seconds) of when this Response was created
    pub created_at: u64,

    /// The model used
    pub model: String,

    /// The status of the response generation
    pub status: ResponseStatus,

    /// An array of content items generated by the model
    pub output: Vec<OutputItem>,

    /// Concatenated assistant text
    pub output_text: String,

    /// Usage statistics
    pub usage: Option<ResponseUsage>,

    /// Present while the client must submit tool outputs
    pub required_action: Option<RequiredAction>,
}

/// Response status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Completed,
    InProgress,
    Incomplete,
    Failed,
}

/// Output items from the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    /// Reasoning text surfaced by the upstream model
    Reasoning {
        id: String,
        content: Vec<OutputContent>,
        #[serde(default)]
        summary: Vec<Value>,
    },
    /// Output message
    Message {
        id: String,
        status: OutputItemStatus,
        role: String,
        content: Vec<OutputContent>,
    },
    /// Function tool call
    FunctionCall {
        id: String,
        call_id: String,
        name: String,
        arguments: String,
        status: OutputItemStatus,
    },
}

/// Output item status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputItemStatus {
    InProgress,
    Completed,
    Incomplete,
}

/// Output content types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputContent {
    OutputText {
        text: String,
        #[serde(default)]
        annotations: Vec<Value>,
    },
}

impl OutputContent {
    pub fn text(text: impl Into<String>) -> Self {
        OutputContent::OutputText {
            text: text.into(),
            annotations: vec![],
        }
    }
}

/// Usage under both naming schemes so either kind of client can read it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequiredAction {
    #[serde(rename = "type")]
    pub action_type: String,
    pub submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitToolOutputs {
    pub tool_calls: Vec<ToolCall>,
}

/// Any Responses-shaped object, read only for its `output[]` items.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResponsesOutputEnvelope {
    #[serde(default)]
    pub output: Vec<InputItem>,
}

impl TryFrom<&[u8]> for ResponsesOutputEnvelope {
    type Error = serde_json::Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        serde_json::from_slice(bytes)
    }
}
