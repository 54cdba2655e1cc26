use crate::apis::anthropic::MessagesUsage;
use crate::apis::openai::UsageCounts;
use crate::apis::openai_responses::{FunctionCallOutputItem, ItemContent, ResponseUsage};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

pub trait ExtractText {
    fn extract_text(&self) -> String;
}

/// Helper to create a current unix timestamp
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

// ============================================================================
// TEXT FLATTENING
// ============================================================================

impl ItemContent {
    /// Concatenate every piece of text in this content, recursing through
    /// nested `{text}` / `{content}` shapes. Empty pieces are skipped.
    pub fn flatten(&self, delimiter: &str) -> String {
        match self {
            ItemContent::Text(text) => text.clone(),
            ItemContent::Parts(parts) => join_non_empty(
                parts.iter().map(|part| part.flatten(delimiter)),
                delimiter,
            ),
            ItemContent::Block { text, content } => match text.as_deref() {
                Some(text) if !text.is_empty() => text.to_string(),
                _ => content
                    .as_ref()
                    .map(|content| content.flatten(delimiter))
                    .unwrap_or_default(),
            },
            ItemContent::Other(value) => flatten_value(value, delimiter),
        }
    }
}

/// Flatten an arbitrary JSON value the same way as [`ItemContent::flatten`].
pub fn flatten_value(value: &Value, delimiter: &str) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(parts) => join_non_empty(
            parts.iter().map(|part| flatten_value(part, delimiter)),
            delimiter,
        ),
        Value::Object(map) => ["text", "content"]
            .iter()
            .filter_map(|key| map.get(*key))
            .map(|nested| flatten_value(nested, delimiter))
            .find(|text| !text.is_empty())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn join_non_empty(pieces: impl Iterator<Item = String>, delimiter: &str) -> String {
    pieces
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(delimiter)
}

/// Textual payload of a tool result item.
///
/// Tried in order: `text`, `content` (string or nested parts), then `output`.
/// An `output` string holding a JSON object is searched for a nested
/// `output`/`text`/`content`; an object without those is serialized as is.
pub fn tool_output_text(item: &FunctionCallOutputItem, delimiter: &str) -> String {
    if let Some(text) = item.text.as_deref().filter(|text| !text.is_empty()) {
        return text.to_string();
    }

    if let Some(content) = &item.content {
        let text = content.flatten(delimiter);
        if !text.is_empty() {
            return text;
        }
    }

    match &item.output {
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => {
                nested_output_text(&Value::Object(map), delimiter).unwrap_or_else(|| raw.clone())
            }
            _ => raw.clone(),
        },
        Some(object @ Value::Object(_)) => nested_output_text(object, delimiter)
            .unwrap_or_else(|| object.to_string()),
        Some(parts @ Value::Array(_)) => flatten_value(parts, delimiter),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn nested_output_text(object: &Value, delimiter: &str) -> Option<String> {
    ["output", "text", "content"]
        .iter()
        .filter_map(|key| object.get(*key))
        .map(|nested| match nested {
            Value::Object(_) => nested_output_text(nested, delimiter).unwrap_or_default(),
            other => flatten_value(other, delimiter),
        })
        .find(|text| !text.is_empty())
}

// ============================================================================
// USAGE
// ============================================================================

/// Token usage with the naming differences between APIs resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizedUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl From<&UsageCounts> for NormalizedUsage {
    fn from(usage: &UsageCounts) -> Self {
        let input_tokens = usage.input_tokens.or(usage.prompt_tokens).unwrap_or(0);
        let output_tokens = usage
            .output_tokens
            .or(usage.completion_tokens)
            .unwrap_or(0);
        let total_tokens = usage
            .total_tokens
            .unwrap_or_else(|| input_tokens.saturating_add(output_tokens));
        NormalizedUsage {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

impl From<NormalizedUsage> for MessagesUsage {
    fn from(usage: NormalizedUsage) -> Self {
        MessagesUsage::new(
            u32::try_from(usage.input_tokens).unwrap_or(u32::MAX),
            u32::try_from(usage.output_tokens).unwrap_or(u32::MAX),
        )
    }
}

impl From<NormalizedUsage> for ResponseUsage {
    fn from(usage: NormalizedUsage) -> Self {
        ResponseUsage {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            total_tokens: usage.total_tokens,
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
        }
    }
}
