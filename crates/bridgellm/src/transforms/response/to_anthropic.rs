use crate::apis::anthropic::{
    MessagesContentBlock, MessagesResponse, MessagesRole, MessagesStopReason,
};
use crate::apis::openai::{ChatCompletionsResponse, ToolCall};
use crate::transforms::lib::{ExtractText, NormalizedUsage};
use log::warn;
use serde_json::{Map, Value};

impl From<&ChatCompletionsResponse> for MessagesResponse {
    fn from(response: &ChatCompletionsResponse) -> Self {
        let choice = response.choices.first();
        let message = choice.map(|choice| &choice.message);

        let mut content = Vec::new();
        let text = message
            .and_then(|message| message.content.as_ref())
            .map(|content| content.extract_text())
            .unwrap_or_default();
        if !text.is_empty() {
            content.push(MessagesContentBlock::Text { text });
        }

        let tool_calls = message
            .and_then(|message| message.tool_calls.as_deref())
            .unwrap_or_default();
        content.extend(tool_calls.iter().map(tool_use_block));

        let stop_reason = choice
            .and_then(|choice| choice.finish_reason.as_deref())
            .filter(|reason| !reason.is_empty())
            .map(MessagesStopReason::from_finish_reason)
            .or_else(|| (!tool_calls.is_empty()).then_some(MessagesStopReason::ToolUse));

        MessagesResponse {
            id: Some(response.id.clone()).filter(|id| !id.is_empty()),
            obj_type: Some("message".to_string()),
            role: Some(MessagesRole::Assistant),
            model: Some(response.model.clone()).filter(|model| !model.is_empty()),
            content,
            stop_reason,
            stop_sequence: None,
            usage: response
                .usage
                .as_ref()
                .map(|usage| NormalizedUsage::from(usage).into()),
        }
    }
}

fn tool_use_block(call: &ToolCall) -> MessagesContentBlock {
    let raw = call.function.arguments.trim();
    let input = if raw.is_empty() {
        Value::Object(Map::new())
    } else {
        match serde_json::from_str::<Value>(raw) {
            Ok(object @ Value::Object(_)) => object,
            _ => {
                warn!(
                    "arguments of tool call '{}' are not a JSON object, using empty input",
                    call.id
                );
                Value::Object(Map::new())
            }
        }
    };

    MessagesContentBlock::ToolUse {
        id: call.id.clone(),
        name: call.function.name.clone(),
        input,
    }
}
