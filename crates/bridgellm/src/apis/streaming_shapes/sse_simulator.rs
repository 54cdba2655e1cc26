//! Replays a complete, non-streaming message as a Messages event sequence.

use crate::apis::anthropic::{
    MessagesContentBlock, MessagesContentDelta, MessagesMessageDelta, MessagesResponse,
    MessagesStreamEvent, MessagesStreamMessage, MessagesUsage,
};
use crate::apis::streaming_shapes::UNKNOWN_MODEL;
use crate::config::ConversionOptions;
use log::{debug, warn};
use serde_json::{json, Value};

/// Message id used when the source message carries none.
pub const SIMULATED_MESSAGE_ID: &str = "msg_simulated";

/// Produce the full event sequence for `message`.
///
/// Pure and deterministic for a given chunk size: block indices follow
/// content order, tool input JSON is split into `input_json_delta` pieces
/// of at most `options.effective_chunk_size()` bytes, and unknown blocks
/// degrade to an empty text block.
pub fn simulate_stream(
    message: &MessagesResponse,
    options: &ConversionOptions,
) -> Vec<MessagesStreamEvent> {
    let chunk_size = options.effective_chunk_size();
    let start_usage = message
        .usage
        .as_ref()
        .map(|usage| MessagesUsage::new(usage.input_tokens, 0))
        .unwrap_or_default();

    let mut events = vec![MessagesStreamEvent::MessageStart {
        message: MessagesStreamMessage::new(
            message
                .id
                .clone()
                .unwrap_or_else(|| SIMULATED_MESSAGE_ID.to_string()),
            message
                .model
                .clone()
                .unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
            start_usage,
        ),
    }];

    for (index, block) in (0u32..).zip(message.content.iter()) {
        match block {
            MessagesContentBlock::Text { text } => {
                events.push(MessagesStreamEvent::ContentBlockStart {
                    index,
                    content_block: MessagesContentBlock::empty_text(),
                });
                if !text.is_empty() {
                    events.push(MessagesStreamEvent::ContentBlockDelta {
                        index,
                        delta: MessagesContentDelta::TextDelta { text: text.clone() },
                    });
                }
            }
            MessagesContentBlock::ToolUse { id, name, input } => {
                events.push(MessagesStreamEvent::ContentBlockStart {
                    index,
                    content_block: MessagesContentBlock::ToolUse {
                        id: id.clone(),
                        name: name.clone(),
                        input: json!({}),
                    },
                });
                for partial_json in tool_input_chunks(input, chunk_size) {
                    events.push(MessagesStreamEvent::ContentBlockDelta {
                        index,
                        delta: MessagesContentDelta::InputJsonDelta { partial_json },
                    });
                }
            }
            MessagesContentBlock::Unknown => {
                debug!("simulating unknown content block {} as empty text", index);
                events.push(MessagesStreamEvent::ContentBlockStart {
                    index,
                    content_block: MessagesContentBlock::empty_text(),
                });
            }
        }
        events.push(MessagesStreamEvent::ContentBlockStop { index });
    }

    events.push(MessagesStreamEvent::MessageDelta {
        delta: MessagesMessageDelta {
            stop_reason: message.stop_reason.clone(),
            stop_sequence: message.stop_sequence.clone(),
        },
        usage: message.usage.clone(),
    });
    events.push(MessagesStreamEvent::MessageStop);
    events
}

fn tool_input_chunks(input: &Value, chunk_size: usize) -> Vec<String> {
    match serde_json::to_string(input) {
        Ok(json) => split_at_char_boundaries(&json, chunk_size),
        Err(e) => {
            warn!("failed to serialize tool input, sending empty object: {}", e);
            vec!["{}".to_string()]
        }
    }
}

/// Split `text` into pieces of at most `max_bytes` bytes without cutting a
/// UTF-8 sequence. A piece is only longer than `max_bytes` when a single
/// character is.
pub fn split_at_char_boundaries(text: &str, max_bytes: usize) -> Vec<String> {
    let max_bytes = max_bytes.max(1);
    let mut pieces = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let mut end = rest.len().min(max_bytes);
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            end = rest
                .char_indices()
                .nth(1)
                .map(|(offset, _)| offset)
                .unwrap_or(rest.len());
        }
        let (piece, tail) = rest.split_at(end);
        pieces.push(piece.to_string());
        rest = tail;
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::anthropic::MessagesStopReason;
    use crate::apis::streaming_shapes::assert_well_formed;
    use pretty_assertions::assert_eq;

    fn text_and_tool_message() -> MessagesResponse {
        serde_json::from_value(json!({
            "id": "msg_1",
            "model": "claude-sonnet",
            "content": [
                {"type": "text", "text": "hello"},
                {"type": "tool_use", "id": "toolu_1", "name": "x", "input": {"a": 1}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 4}
        }))
        .unwrap()
    }

    #[test]
    fn test_text_and_tool_sequence() {
        let events = simulate_stream(&text_and_tool_message(), &ConversionOptions::default());
        assert_well_formed(&events);

        let names: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(
            names,
            vec![
                "message_start",
                "content_block_start",
                "content_block_delta",
                "content_block_stop",
                "content_block_start",
                "content_block_delta",
                "content_block_stop",
                "message_delta",
                "message_stop",
            ]
        );

        assert_eq!(
            events[2],
            MessagesStreamEvent::ContentBlockDelta {
                index: 0,
                delta: MessagesContentDelta::TextDelta {
                    text: "hello".to_string()
                },
            }
        );
        assert_eq!(
            events[4],
            MessagesStreamEvent::ContentBlockStart {
                index: 1,
                content_block: MessagesContentBlock::ToolUse {
                    id: "toolu_1".to_string(),
                    name: "x".to_string(),
                    input: json!({}),
                },
            }
        );
        assert_eq!(
            events[5],
            MessagesStreamEvent::ContentBlockDelta {
                index: 1,
                delta: MessagesContentDelta::InputJsonDelta {
                    partial_json: "{\"a\":1}".to_string()
                },
            }
        );
    }

    #[test]
    fn test_message_start_and_delta_fields() {
        let events = simulate_stream(&text_and_tool_message(), &ConversionOptions::default());

        match &events[0] {
            MessagesStreamEvent::MessageStart { message } => {
                assert_eq!(message.id, "msg_1");
                assert_eq!(message.model, "claude-sonnet");
                assert!(message.content.is_empty());
                assert_eq!(message.stop_reason, None);
                assert_eq!(message.usage, MessagesUsage::new(10, 0));
            }
            other => panic!("Expected message_start, got {:?}", other),
        }

        match &events[7] {
            MessagesStreamEvent::MessageDelta { delta, usage } => {
                assert_eq!(delta.stop_reason, Some(MessagesStopReason::ToolUse));
                assert_eq!(usage.as_ref(), Some(&MessagesUsage::new(10, 4)));
            }
            other => panic!("Expected message_delta, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults_for_bare_message() {
        let message = MessagesResponse {
            content: vec![MessagesContentBlock::empty_text()],
            ..Default::default()
        };
        let events = simulate_stream(&message, &ConversionOptions::default());
        assert_well_formed(&events);

        // Empty text: start and stop only
        assert_eq!(events.len(), 5);
        match &events[0] {
            MessagesStreamEvent::MessageStart { message } => {
                assert_eq!(message.id, SIMULATED_MESSAGE_ID);
                assert_eq!(message.model, UNKNOWN_MODEL);
                assert_eq!(message.usage, MessagesUsage::default());
            }
            other => panic!("Expected message_start, got {:?}", other),
        }
        let delta = serde_json::to_value(&events[3]).unwrap();
        assert_eq!(
            delta,
            json!({"type": "message_delta", "delta": {"stop_reason": null, "stop_sequence": null}})
        );
    }

    #[test]
    fn test_unknown_block_degrades_to_empty_text() {
        let message: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "answer"}
            ]
        }))
        .unwrap();
        let events = simulate_stream(&message, &ConversionOptions::default());
        assert_well_formed(&events);

        assert_eq!(
            events[1],
            MessagesStreamEvent::ContentBlockStart {
                index: 0,
                content_block: MessagesContentBlock::empty_text(),
            }
        );
        assert_eq!(events[2], MessagesStreamEvent::ContentBlockStop { index: 0 });
        assert_eq!(events[3].block_index(), Some(1));
    }

    #[test]
    fn test_large_tool_input_is_chunked() {
        let long_value = "é".repeat(400);
        let message = MessagesResponse {
            content: vec![MessagesContentBlock::ToolUse {
                id: "toolu_big".to_string(),
                name: "write".to_string(),
                input: json!({ "body": long_value }),
            }],
            ..Default::default()
        };
        let options = ConversionOptions {
            sse_chunk_size: 129,
            ..Default::default()
        };
        let events = simulate_stream(&message, &options);
        assert_well_formed(&events);

        let pieces: Vec<String> = events
            .iter()
            .filter_map(|event| match event {
                MessagesStreamEvent::ContentBlockDelta {
                    delta: MessagesContentDelta::InputJsonDelta { partial_json },
                    ..
                } => Some(partial_json.clone()),
                _ => None,
            })
            .collect();

        assert!(pieces.len() > 1);
        assert!(pieces.iter().all(|piece| piece.len() <= 129));
        let rebuilt: Value = serde_json::from_str(&pieces.concat()).unwrap();
        assert_eq!(rebuilt, json!({ "body": "é".repeat(400) }));
    }

    #[test]
    fn test_deterministic() {
        let message = text_and_tool_message();
        let options = ConversionOptions::default();
        assert_eq!(
            simulate_stream(&message, &options),
            simulate_stream(&message, &options)
        );
    }

    #[test]
    fn test_split_at_char_boundaries() {
        assert_eq!(split_at_char_boundaries("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(split_at_char_boundaries("aé", 2), vec!["a", "é"]);
        assert_eq!(split_at_char_boundaries("é", 1), vec!["é"]);
        assert!(split_at_char_boundaries("", 4).is_empty());
    }
}
