use crate::apis::openai::{
    ChatCompletionsRequest, Function, FunctionCall, FunctionChoice, Message, Role, Tool,
    ToolCall, ToolChoice,
};
use crate::apis::openai_responses::{
    FunctionCallItem, FunctionCallOutputItem, InputItem, InputParam, ItemMessage, ItemRef,
    MessageRole, ResponsesAPIRequest, ResponsesTool, ResponsesToolChoice,
};
use crate::clients::TransformError;
use crate::config::ConversionOptions;
use crate::transforms::lib::{flatten_value, tool_output_text};
use crate::transforms::tool_schema::{empty_object_schema, ToolSchemaMap};
use log::{debug, warn};

// ============================================================================
// MAIN REQUEST TRANSFORMATIONS
// ============================================================================

impl TryFrom<&ResponsesAPIRequest> for ChatCompletionsRequest {
    type Error = TransformError;

    fn try_from(request: &ResponsesAPIRequest) -> Result<Self, Self::Error> {
        convert_responses_request(request, &ConversionOptions::default())
    }
}

/// Convert a Responses request into the Chat Completions request sent upstream.
pub fn convert_responses_request(
    request: &ResponsesAPIRequest,
    options: &ConversionOptions,
) -> Result<ChatCompletionsRequest, TransformError> {
    let instructions = request
        .instructions
        .as_deref()
        .filter(|instructions| !instructions.trim().is_empty());

    if request.input.is_empty() && instructions.is_none() {
        return Err(TransformError::validation("Input cannot be empty"));
    }

    let declared_tools = request.tools.as_deref().unwrap_or_default();
    let schemas = ToolSchemaMap::from_tools(declared_tools);

    let mut messages = Vec::new();
    // Role filters never apply to instructions
    if let Some(instructions) = instructions {
        messages.push(Message::text(Role::System, instructions));
    }

    let mut has_tool_result = false;
    match &request.input {
        InputParam::Text(text) => {
            if !text.trim().is_empty() {
                messages.push(Message::text(Role::User, text.as_str()));
            }
        }
        InputParam::Items(items) => {
            has_tool_result = items
                .iter()
                .any(|item| matches!(item.view(), ItemRef::FunctionCallOutput(_)));
            messages.extend(convert_input_items(items, &schemas, options)?);
        }
    }

    if !messages.iter().any(|message| message.role == Role::User) {
        return Err(TransformError::validation(
            "Request must contain at least one user message",
        ));
    }

    let tools = convert_tools(declared_tools);
    let tool_choice = match (&request.tool_choice, &tools) {
        (Some(_), _) if has_tool_result => {
            debug!("dropping tool_choice: input carries tool results");
            None
        }
        (Some(choice), Some(_)) => convert_tool_choice(choice),
        _ => None,
    };
    let parallel_tool_calls = tools.as_ref().and(request.parallel_tool_calls);

    Ok(ChatCompletionsRequest {
        model: request.model.clone(),
        messages,
        stream: false,
        temperature: request.temperature,
        top_p: request.top_p,
        max_completion_tokens: request.max_output_tokens,
        tools,
        tool_choice,
        parallel_tool_calls,
        user: request.user.clone(),
        metadata: request.metadata.clone(),
    })
}

/// Walk `input[]` in order.
///
/// Only the last user message is this turn's content; earlier ones were
/// already answered. With no user message at all, the text of the whole
/// input becomes a single user message placed before the converted items.
fn convert_input_items(
    items: &[InputItem],
    schemas: &ToolSchemaMap,
    options: &ConversionOptions,
) -> Result<Vec<Message>, TransformError> {
    let last_user_index = items.iter().rposition(|item| {
        matches!(item.view(), ItemRef::Message(message) if is_user(message, options))
    });

    let mut messages = Vec::new();
    let mut last_call_id: Option<String> = None;

    for (position, item) in items.iter().enumerate() {
        match item.view() {
            ItemRef::Message(message) => {
                if options.ignores_role(message.role.as_str()) {
                    debug!("ignoring {} message item", message.role.as_str());
                    continue;
                }
                if message.role == MessageRole::User && Some(position) != last_user_index {
                    debug!("skipping earlier user message item at {}", position);
                    continue;
                }
                if let Some(converted) = convert_message_item(message, options) {
                    messages.push(converted);
                }
            }
            ItemRef::FunctionCall(call) => {
                let tool_call = convert_function_call(call, schemas)?;
                last_call_id = Some(tool_call.id.clone());
                messages.push(Message::assistant_tool_calls(vec![tool_call]));
            }
            ItemRef::FunctionCallOutput(output) => {
                messages.push(convert_tool_output(
                    output,
                    last_call_id.as_deref(),
                    options,
                )?);
            }
            ItemRef::Unknown(value) => {
                debug!("dropping input item without a known type: {}", value);
            }
        }
    }

    if last_user_index.is_none() {
        // Tool output text also stays in its tool message, so it appears twice
        let text = flatten_input(items, options);
        if !text.is_empty() {
            let insert_at = messages
                .iter()
                .take_while(|message| message.role == Role::System)
                .count();
            messages.insert(insert_at, Message::text(Role::User, text));
        }
    }

    Ok(messages)
}

fn is_user(message: &ItemMessage, options: &ConversionOptions) -> bool {
    message.role == MessageRole::User && !options.ignores_role(message.role.as_str())
}

fn convert_message_item(message: &ItemMessage, options: &ConversionOptions) -> Option<Message> {
    let text = message
        .content
        .as_ref()
        .map(|content| content.flatten(&options.text_delimiter))
        .unwrap_or_default();
    if text.is_empty() {
        debug!("dropping {} message item without text", message.role.as_str());
        return None;
    }

    let role = match message.role {
        MessageRole::User => Role::User,
        MessageRole::Assistant => Role::Assistant,
        MessageRole::System | MessageRole::Developer => Role::System,
    };
    Some(Message::text(role, text))
}

fn convert_function_call(
    call: &FunctionCallItem,
    schemas: &ToolSchemaMap,
) -> Result<ToolCall, TransformError> {
    let name = call
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| TransformError::validation("Function call item is missing a name"))?;
    let arguments = schemas.normalize_arguments(name, call.arguments.as_ref())?;
    let id = call.call_id().map(str::to_string).unwrap_or_else(|| {
        format!("call_{}", uuid::Uuid::new_v4().to_string().replace('-', ""))
    });

    Ok(ToolCall {
        id,
        call_type: "function".to_string(),
        function: FunctionCall {
            name: name.to_string(),
            arguments,
        },
    })
}

fn convert_tool_output(
    output: &FunctionCallOutputItem,
    last_call_id: Option<&str>,
    options: &ConversionOptions,
) -> Result<Message, TransformError> {
    let call_id = output
        .explicit_call_id()
        .or(last_call_id)
        .ok_or_else(|| {
            TransformError::validation("Tool result has no call id and follows no function call")
        })?;

    let text = tool_output_text(output, &options.text_delimiter);
    if text.trim().is_empty() {
        return Err(TransformError::validation(format!(
            "Tool result for call '{}' is empty",
            call_id
        )));
    }

    Ok(Message::tool_result(call_id, text))
}

/// Text of every item, used when no user message item exists.
fn flatten_input(items: &[InputItem], options: &ConversionOptions) -> String {
    let delimiter = &options.text_delimiter;
    items
        .iter()
        .filter_map(|item| match item.view() {
            ItemRef::Message(message) if !options.ignores_role(message.role.as_str()) => message
                .content
                .as_ref()
                .map(|content| content.flatten(delimiter)),
            ItemRef::Message(_) | ItemRef::FunctionCall(_) => None,
            ItemRef::FunctionCallOutput(output) => Some(tool_output_text(output, delimiter)),
            ItemRef::Unknown(value) => Some(flatten_value(value, delimiter)),
        })
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(delimiter)
}

fn convert_tools(tools: &[ResponsesTool]) -> Option<Vec<Tool>> {
    let converted: Vec<Tool> = tools
        .iter()
        .filter_map(ResponsesTool::function)
        .map(|function| Tool {
            tool_type: "function".to_string(),
            function: Function {
                name: function.name.clone(),
                description: function.description.clone(),
                parameters: function
                    .parameters
                    .clone()
                    .unwrap_or_else(empty_object_schema),
                strict: function.strict,
            },
        })
        .collect();

    if converted.is_empty() {
        None
    } else {
        Some(converted)
    }
}

fn convert_tool_choice(choice: &ResponsesToolChoice) -> Option<ToolChoice> {
    match choice {
        ResponsesToolChoice::Mode(mode) => Some(ToolChoice::Mode(mode.clone())),
        ResponsesToolChoice::Named {
            choice_type,
            name,
            function,
        } => {
            let name = name
                .clone()
                .or_else(|| function.as_ref().map(|function| function.name.clone()));
            match name {
                Some(name) if choice_type == "function" => Some(ToolChoice::Function {
                    choice_type: "function".to_string(),
                    function: FunctionChoice { name },
                }),
                _ => {
                    warn!("unsupported tool_choice of type '{}', dropping it", choice_type);
                    None
                }
            }
        }
    }
}
