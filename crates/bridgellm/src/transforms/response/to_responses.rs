use crate::apis::openai::{ChatCompletionsResponse, FunctionCall, ToolCall};
use crate::apis::openai_responses::{
    OutputContent, OutputItem, OutputItemStatus, RequiredAction, ResponseStatus,
    ResponsesAPIResponse, SubmitToolOutputs,
};
use crate::clients::TransformError;
use crate::transforms::lib::{current_timestamp, ExtractText, NormalizedUsage};
use log::warn;
use serde_json::{Map, Value};

/// Tool base names that some clients emit namespaced as `<server>.<base>`.
pub const NAMESPACED_TOOL_BASES: [&str; 3] = [
    "read_mcp_resource",
    "list_mcp_resources",
    "list_mcp_resource_templates",
];

const SUBMIT_TOOL_OUTPUTS: &str = "submit_tool_outputs";

impl TryFrom<&ChatCompletionsResponse> for ResponsesAPIResponse {
    type Error = TransformError;

    fn try_from(response: &ChatCompletionsResponse) -> Result<Self, Self::Error> {
        let message = response.first_message();
        let text = message
            .and_then(|message| message.content.as_ref())
            .map(|content| content.extract_text())
            .unwrap_or_default();
        let reasoning = message
            .and_then(|message| message.reasoning_content.as_deref())
            .filter(|reasoning| !reasoning.trim().is_empty());

        let tool_calls = message
            .and_then(|message| message.tool_calls.as_deref())
            .unwrap_or_default()
            .iter()
            .map(canonicalize_tool_call)
            .collect::<Result<Vec<_>, _>>()?;

        let base_id = if response.id.is_empty() {
            uuid::Uuid::new_v4().to_string().replace('-', "")
        } else {
            response.id.clone()
        };

        let mut output = Vec::new();
        if let Some(reasoning) = reasoning {
            output.push(OutputItem::Reasoning {
                id: format!("rs_{}", base_id),
                content: vec![OutputContent::text(reasoning)],
                summary: vec![],
            });
        }
        if !text.is_empty() || tool_calls.is_empty() {
            output.push(OutputItem::Message {
                id: format!("msg_{}", base_id),
                status: OutputItemStatus::Completed,
                role: "assistant".to_string(),
                content: vec![OutputContent::text(text.as_str())],
            });
        }
        output.extend(tool_calls.iter().map(|call| OutputItem::FunctionCall {
            id: format!("fc_{}", call.id),
            call_id: call.id.clone(),
            name: call.function.name.clone(),
            arguments: call.function.arguments.clone(),
            status: OutputItemStatus::InProgress,
        }));

        let (status, required_action) = if tool_calls.is_empty() {
            (ResponseStatus::Completed, None)
        } else {
            (
                ResponseStatus::InProgress,
                Some(RequiredAction {
                    action_type: SUBMIT_TOOL_OUTPUTS.to_string(),
                    submit_tool_outputs: SubmitToolOutputs { tool_calls },
                }),
            )
        };

        Ok(ResponsesAPIResponse {
            id: format!("resp_{}", base_id),
            object: "response".to_string(),
            created_at: response.created.unwrap_or_else(current_timestamp),
            model: response.model.clone(),
            status,
            output,
            output_text: text,
            usage: response
                .usage
                .as_ref()
                .map(|usage| NormalizedUsage::from(usage).into()),
            required_action,
        })
    }
}

/// Rewrite `<server>.<base>` calls of the known namespaced tools to `<base>`
/// with `server` injected into the arguments, unless already present.
pub fn canonicalize_tool_call(call: &ToolCall) -> Result<ToolCall, TransformError> {
    let Some((server, base)) = call.function.name.rsplit_once('.') else {
        return Ok(call.clone());
    };
    if server.is_empty() || !NAMESPACED_TOOL_BASES.contains(&base) {
        return Ok(call.clone());
    }

    let raw_arguments = call.function.arguments.trim();
    let parsed = if raw_arguments.is_empty() {
        Some(Map::new())
    } else {
        match serde_json::from_str::<Value>(raw_arguments) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    };

    let arguments = match parsed {
        Some(mut map) => {
            map.entry("server")
                .or_insert_with(|| Value::String(server.to_string()));
            serde_json::to_string(&map).map_err(|e| {
                TransformError::Serialization(format!(
                    "failed to encode arguments for tool '{}': {}",
                    base, e
                ))
            })?
        }
        None => {
            warn!(
                "arguments of '{}' are not a JSON object, leaving them untouched",
                call.function.name
            );
            call.function.arguments.clone()
        }
    };

    Ok(ToolCall {
        id: call.id.clone(),
        call_type: call.call_type.clone(),
        function: FunctionCall {
            name: base.to_string(),
            arguments,
        },
    })
}
