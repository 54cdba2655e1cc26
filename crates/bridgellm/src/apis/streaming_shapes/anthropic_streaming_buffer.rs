use crate::apis::anthropic::{
    MessagesContentBlock, MessagesContentDelta, MessagesMessageDelta, MessagesStopReason,
    MessagesStreamEvent, MessagesStreamMessage, MessagesUsage,
};
use crate::apis::openai::{ChatCompletionsStreamResponse, ToolCallDelta};
use crate::apis::streaming_shapes::UNKNOWN_MODEL;
use crate::transforms::lib::NormalizedUsage;
use log::debug;
use serde_json::json;
use std::collections::BTreeMap;

/// Text always occupies block 0; tool call `i` becomes block `i + 1`.
const TEXT_BLOCK_INDEX: u32 = 0;

/// Per-index tool call state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCallAccumulator {
    pub id: String,
    pub name: String,
    /// Argument fragments seen so far, concatenated verbatim
    pub arguments: String,
    pub started: bool,
    pub stopped: bool,
}

/// Everything known about one upstream stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamState {
    pub message_id: Option<String>,
    pub model: Option<String>,
    pub created_at: Option<u64>,
    pub started: bool,
    pub text_started: bool,
    pub text_stopped: bool,
    /// Keyed by the upstream (zero-based) tool call index
    pub tool_calls: BTreeMap<u32, ToolCallAccumulator>,
    pub last_tool_index: Option<u32>,
    pub finish_reason: Option<String>,
    pub usage: Option<NormalizedUsage>,
    pub message_delta_sent: bool,
    pub finalized: bool,
}

/// Re-emits a Chat Completions chunk stream as Messages stream events.
///
/// Block lifecycle events are generated as chunks arrive:
/// - MessageStart → ContentBlockStart → ContentBlockDelta(s) → ContentBlockStop → MessageDelta → MessageStop
///
/// The single MessageDelta waits until both the finish reason and usage are
/// known, or until `finalize`. One buffer serves exactly one stream.
#[derive(Debug, Default)]
pub struct AnthropicMessagesStreamBuffer {
    state: StreamState,
}

impl AnthropicMessagesStreamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Decode one chunk payload and process it. Payloads that are not a chunk
    /// object at all produce no events.
    pub fn process_json(&mut self, payload: &[u8]) -> Vec<MessagesStreamEvent> {
        match ChatCompletionsStreamResponse::try_from(payload) {
            Ok(chunk) => self.process_chunk(&chunk),
            Err(e) => {
                debug!("ignoring undecodable chunk: {}", e);
                Vec::new()
            }
        }
    }

    pub fn process_chunk(&mut self, chunk: &ChatCompletionsStreamResponse) -> Vec<MessagesStreamEvent> {
        let mut events = Vec::new();
        if self.state.finalized {
            debug!("chunk received after finalize, dropping");
            return events;
        }

        self.record_metadata(chunk);

        if let Some(choice) = chunk.choices.first() {
            if choice.delta.role.as_deref() == Some("assistant") {
                self.ensure_started(&mut events);
            }

            if let Some(text) = choice.delta.content.as_deref().filter(|t| !t.is_empty()) {
                self.push_text(text, &mut events);
            }

            for tool_call in choice.delta.tool_calls.iter().flatten() {
                self.push_tool_call(tool_call, &mut events);
            }

            if let Some(reason) = choice.finish_reason.as_deref().filter(|r| !r.is_empty()) {
                self.ensure_started(&mut events);
                self.stop_open_blocks(&mut events);
                if self.state.finish_reason.is_none() {
                    self.state.finish_reason = Some(reason.to_string());
                }
            }
        }

        if let Some(usage) = &chunk.usage {
            self.state.usage = Some(NormalizedUsage::from(usage));
        }

        if self.state.finish_reason.is_some() && self.state.usage.is_some() {
            self.push_message_delta(&mut events);
        }

        events
    }

    /// Close the stream. Emits whatever is still missing for a well-formed
    /// sequence, ending with `message_stop`. Later calls return nothing.
    pub fn finalize(&mut self) -> Vec<MessagesStreamEvent> {
        let mut events = Vec::new();
        if self.state.finalized {
            return events;
        }

        self.ensure_started(&mut events);
        self.stop_open_blocks(&mut events);
        self.push_message_delta(&mut events);
        events.push(MessagesStreamEvent::MessageStop);
        self.state.finalized = true;
        events
    }

    fn record_metadata(&mut self, chunk: &ChatCompletionsStreamResponse) {
        if self.state.message_id.is_none() {
            self.state.message_id = chunk.id.clone().filter(|id| !id.is_empty());
        }
        if self.state.model.is_none() {
            self.state.model = chunk.model.clone().filter(|model| !model.is_empty());
        }
        if self.state.created_at.is_none() {
            self.state.created_at = chunk.created;
        }
    }

    fn ensure_started(&mut self, events: &mut Vec<MessagesStreamEvent>) {
        if self.state.started {
            return;
        }
        let id = self
            .state
            .message_id
            .get_or_insert_with(|| generate_id("msg"))
            .clone();
        let model = self
            .state
            .model
            .clone()
            .unwrap_or_else(|| UNKNOWN_MODEL.to_string());

        events.push(MessagesStreamEvent::MessageStart {
            message: MessagesStreamMessage::new(id, model, MessagesUsage::default()),
        });
        self.state.started = true;
    }

    fn accepts_content(&self) -> bool {
        !self.state.message_delta_sent && self.state.finish_reason.is_none()
    }

    fn push_text(&mut self, text: &str, events: &mut Vec<MessagesStreamEvent>) {
        if !self.accepts_content() || self.state.text_stopped {
            debug!("dropping text delta after the text block closed");
            return;
        }

        self.ensure_started(events);
        if !self.state.text_started {
            events.push(MessagesStreamEvent::ContentBlockStart {
                index: TEXT_BLOCK_INDEX,
                content_block: MessagesContentBlock::empty_text(),
            });
            self.state.text_started = true;
        }
        events.push(MessagesStreamEvent::ContentBlockDelta {
            index: TEXT_BLOCK_INDEX,
            delta: MessagesContentDelta::TextDelta {
                text: text.to_string(),
            },
        });
    }

    fn push_tool_call(&mut self, tool_call: &ToolCallDelta, events: &mut Vec<MessagesStreamEvent>) {
        // Fragments without an index continue the most recent call
        let index = tool_call
            .index
            .or(self.state.last_tool_index)
            .unwrap_or(0);
        self.state.last_tool_index = Some(index);
        let block_index = index.saturating_add(1);

        if !self.accepts_content() {
            debug!("dropping tool call {} delta after finish", index);
            return;
        }

        let needs_start = match self.state.tool_calls.get(&index) {
            Some(accumulator) if accumulator.stopped => {
                debug!("dropping tool call {} delta after its block closed", index);
                return;
            }
            Some(accumulator) => !accumulator.started,
            None => true,
        };

        let function = tool_call.function.as_ref();
        if needs_start {
            self.ensure_started(events);
            let id = tool_call
                .id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| generate_id("call"));
            let name = function
                .and_then(|function| function.name.clone())
                .unwrap_or_default();

            events.push(MessagesStreamEvent::ContentBlockStart {
                index: block_index,
                content_block: MessagesContentBlock::ToolUse {
                    id: id.clone(),
                    name: name.clone(),
                    input: json!({}),
                },
            });
            self.state.tool_calls.insert(
                index,
                ToolCallAccumulator {
                    id,
                    name,
                    arguments: String::new(),
                    started: true,
                    stopped: false,
                },
            );
        }

        let fragment = function
            .and_then(|function| function.arguments.as_deref())
            .filter(|arguments| !arguments.is_empty());
        if let Some(fragment) = fragment {
            if let Some(accumulator) = self.state.tool_calls.get_mut(&index) {
                accumulator.arguments.push_str(fragment);
            }
            events.push(MessagesStreamEvent::ContentBlockDelta {
                index: block_index,
                delta: MessagesContentDelta::InputJsonDelta {
                    partial_json: fragment.to_string(),
                },
            });
        }
    }

    fn stop_open_blocks(&mut self, events: &mut Vec<MessagesStreamEvent>) {
        if self.state.text_started && !self.state.text_stopped {
            events.push(MessagesStreamEvent::ContentBlockStop {
                index: TEXT_BLOCK_INDEX,
            });
            self.state.text_stopped = true;
        }

        for (index, accumulator) in self.state.tool_calls.iter_mut() {
            if accumulator.started && !accumulator.stopped {
                events.push(MessagesStreamEvent::ContentBlockStop {
                    index: index.saturating_add(1),
                });
                accumulator.stopped = true;
            }
        }
    }

    fn push_message_delta(&mut self, events: &mut Vec<MessagesStreamEvent>) {
        if self.state.message_delta_sent {
            return;
        }
        let usage = self.state.usage.unwrap_or_default();

        events.push(MessagesStreamEvent::MessageDelta {
            delta: MessagesMessageDelta {
                stop_reason: self
                    .state
                    .finish_reason
                    .as_deref()
                    .map(MessagesStopReason::from_finish_reason),
                stop_sequence: None,
            },
            usage: Some(usage.into()),
        });
        self.state.message_delta_sent = true;
    }
}

fn generate_id(prefix: &str) -> String {
    format!(
        "{}_{}",
        prefix,
        uuid::Uuid::new_v4().to_string().replace('-', "")
    )
}
