//! Declared tool schemas and strict tool-call argument normalization

use crate::apis::openai_responses::ResponsesTool;
use crate::clients::TransformError;
use log::warn;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Arguments may be JSON text wrapped in at most this many string layers.
const MAX_ARGUMENT_ENCODING_DEPTH: usize = 2;

/// Tool name to declared JSON schema `parameters`, built once per request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolSchemaMap {
    schemas: HashMap<String, Value>,
}

impl ToolSchemaMap {
    /// Function tools only; a function without `parameters` accepts an empty object.
    pub fn from_tools(tools: &[ResponsesTool]) -> Self {
        let mut schemas = HashMap::new();
        for tool in tools {
            match tool.function() {
                Some(function) => {
                    let parameters = function
                        .parameters
                        .clone()
                        .unwrap_or_else(empty_object_schema);
                    schemas.insert(function.name.clone(), parameters);
                }
                None => warn!(
                    "tool of type '{}' has no chat completions equivalent, dropping it",
                    tool.type_name()
                ),
            }
        }
        Self { schemas }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Decode, validate and re-encode the arguments of a call to `name`.
    ///
    /// Arguments arrive as an object or as JSON text encoded up to twice. A
    /// declared `command` property is enforced: `array<string>` requires an
    /// array of strings, `string` accepts a string or joins an array of
    /// strings with single spaces.
    pub fn normalize_arguments(
        &self,
        name: &str,
        arguments: Option<&Value>,
    ) -> Result<String, TransformError> {
        let schema = self.get(name).ok_or_else(|| {
            TransformError::validation(format!("No schema declared for tool '{}'", name))
        })?;

        let mut arguments = decode_arguments(name, arguments)?;
        normalize_command(name, schema, &mut arguments)?;

        serde_json::to_string(&Value::Object(arguments)).map_err(|e| {
            TransformError::Serialization(format!(
                "failed to encode arguments for tool '{}': {}",
                name, e
            ))
        })
    }
}

pub fn empty_object_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

fn decode_arguments(
    name: &str,
    arguments: Option<&Value>,
) -> Result<Map<String, Value>, TransformError> {
    let mut value = arguments.cloned().unwrap_or(Value::Null);

    for _ in 0..MAX_ARGUMENT_ENCODING_DEPTH {
        let Value::String(text) = &value else {
            break;
        };
        if text.trim().is_empty() {
            value = Value::Null;
            break;
        }
        value = serde_json::from_str(text).map_err(|e| {
            TransformError::validation(format!(
                "Arguments for tool '{}' are not valid JSON: {}",
                name, e
            ))
        })?;
    }

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(TransformError::validation(format!(
            "Arguments for tool '{}' must be a JSON object",
            name
        ))),
    }
}

fn normalize_command(
    name: &str,
    schema: &Value,
    arguments: &mut Map<String, Value>,
) -> Result<(), TransformError> {
    let Some(command_schema) = schema.pointer("/properties/command") else {
        return Ok(());
    };
    let Some(command) = arguments.get_mut("command") else {
        return Ok(());
    };

    match command_schema.get("type").and_then(Value::as_str) {
        Some("array") => {
            let string_items_required = command_schema
                .pointer("/items/type")
                .and_then(Value::as_str)
                == Some("string");
            let valid = command.is_array()
                && (!string_items_required || string_items(command).is_some());
            if !valid {
                let expected = if string_items_required {
                    "an array of strings"
                } else {
                    "an array"
                };
                return Err(TransformError::validation(format!(
                    "Tool '{}' expects 'command' to be {}",
                    name, expected
                )));
            }
        }
        Some("string") => match command {
            Value::String(_) => {}
            Value::Array(_) => {
                let joined = string_items(command)
                    .map(|parts| parts.join(" "))
                    .ok_or_else(|| {
                        TransformError::validation(format!(
                            "Tool '{}' expects 'command' to be a string",
                            name
                        ))
                    })?;
                *command = Value::String(joined);
            }
            _ => {
                return Err(TransformError::validation(format!(
                    "Tool '{}' expects 'command' to be a string",
                    name
                )))
            }
        },
        _ => {}
    }
    Ok(())
}

fn string_items(value: &Value) -> Option<Vec<&str>> {
    value.as_array()?.iter().map(Value::as_str).collect()
}
