//! Conversions from response outputs to request inputs for conversation continuation
//!
//! A previously returned Responses object is folded back into Chat Completions
//! messages so a tool-output submission can be replayed upstream. Only items
//! with a known type tag are mapped; everything else is dropped.

use crate::apis::openai::{FunctionCall, Message, Role, ToolCall};
use crate::apis::openai_responses::{
    FunctionCallItem, InputItem, ItemRef, MessageRole, ResponsesAPIResponse,
    ResponsesOutputEnvelope,
};
use crate::clients::TransformError;
use crate::config::ConversionOptions;
use crate::transforms::lib::tool_output_text;
use log::debug;
use serde_json::Value;

/// Fold `output[]` items into Chat messages, in order.
///
/// Consecutive function calls become one assistant message carrying all of
/// them. Tool results without an explicit id answer the most recent call.
pub fn outputs_to_messages(items: &[InputItem], options: &ConversionOptions) -> Vec<Message> {
    let delimiter = &options.text_delimiter;
    let mut messages = Vec::new();
    let mut pending_calls: Vec<ToolCall> = Vec::new();
    let mut last_call_id: Option<String> = None;

    for item in items {
        let view = item.view();
        if !matches!(view, ItemRef::FunctionCall(_)) && !pending_calls.is_empty() {
            messages.push(Message::assistant_tool_calls(std::mem::take(
                &mut pending_calls,
            )));
        }

        match view {
            ItemRef::FunctionCall(call) => match output_tool_call(call) {
                Some(tool_call) => {
                    last_call_id = Some(tool_call.id.clone());
                    pending_calls.push(tool_call);
                }
                None => debug!("dropping function_call without id or name"),
            },
            ItemRef::FunctionCallOutput(output) => {
                match output.explicit_call_id().or(last_call_id.as_deref()) {
                    Some(call_id) => messages.push(Message::tool_result(
                        call_id,
                        tool_output_text(output, delimiter),
                    )),
                    None => debug!("dropping tool result that answers no call"),
                }
            }
            ItemRef::Message(message) => {
                let text = message
                    .content
                    .as_ref()
                    .map(|content| content.flatten(delimiter))
                    .unwrap_or_default();
                if text.is_empty() {
                    continue;
                }
                let role = match message.role {
                    MessageRole::User => Role::User,
                    MessageRole::Assistant => Role::Assistant,
                    MessageRole::System | MessageRole::Developer => Role::System,
                };
                messages.push(Message::text(role, text));
            }
            ItemRef::Unknown(_) => debug!("dropping output item without a known type"),
        }
    }

    if !pending_calls.is_empty() {
        messages.push(Message::assistant_tool_calls(pending_calls));
    }
    messages
}

/// Fold one of our own Responses objects back into Chat messages.
pub fn response_to_messages(
    response: &ResponsesAPIResponse,
    options: &ConversionOptions,
) -> Result<Vec<Message>, TransformError> {
    let envelope: ResponsesOutputEnvelope = serde_json::from_value(serde_json::to_value(response)?)?;
    Ok(outputs_to_messages(&envelope.output, options))
}

fn output_tool_call(call: &FunctionCallItem) -> Option<ToolCall> {
    let id = call.call_id()?;
    let name = call.name.as_deref().filter(|name| !name.is_empty())?;
    let arguments = match &call.arguments {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => "{}".to_string(),
        Some(other) => other.to_string(),
    };

    Some(ToolCall {
        id: id.to_string(),
        call_type: "function".to_string(),
        function: FunctionCall {
            name: name.to_string(),
            arguments,
        },
    })
}
