use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;

use bridgellm::apis::{ChatCompletionsStreamResponse, MessagesStreamEvent};
use bridgellm::{AnthropicMessagesStreamBuffer, SseChunkProcessor, SseEvent};
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, warn};

pub const UPSTREAM_ERROR_TYPE: &str = "api_error";

struct TransformState<S> {
    upstream: Pin<Box<S>>,
    processor: SseChunkProcessor,
    buffer: AnthropicMessagesStreamBuffer,
    pending: VecDeque<SseEvent>,
    finished: bool,
}

impl<S> TransformState<S> {
    fn push_chunks(&mut self, chunks: Vec<ChatCompletionsStreamResponse>) {
        for chunk in chunks {
            let events = self.buffer.process_chunk(&chunk);
            self.push_events(&events);
        }
    }

    fn push_events(&mut self, events: &[MessagesStreamEvent]) {
        for event in events {
            match SseEvent::try_from(event) {
                Ok(frame) => self.pending.push_back(frame),
                Err(e) => warn!("failed to encode {} event: {}", event.event_type(), e),
            }
        }
    }

    fn finish(&mut self) {
        let rest = self.processor.flush();
        self.push_chunks(rest);
        let trailer = self.buffer.finalize();
        self.push_events(&trailer);
        self.finished = true;
    }
}

/// Re-emit an upstream Chat Completions SSE byte stream as Messages frames.
///
/// Reading stops at `[DONE]` or the end of the upstream, after which the
/// `finalize` trailer is emitted. A failed upstream read ends the stream with
/// a single `error` frame and no trailer.
pub fn transform_chat_stream<S, E>(upstream: S) -> impl Stream<Item = SseEvent> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: fmt::Display + Send,
{
    let state = TransformState {
        upstream: Box::pin(upstream),
        processor: SseChunkProcessor::new(),
        buffer: AnthropicMessagesStreamBuffer::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.pending.pop_front() {
                return Some((frame, state));
            }
            if state.finished {
                return None;
            }

            match state.upstream.next().await {
                Some(Ok(bytes)) => {
                    let chunks = state.processor.process_bytes(&bytes);
                    state.push_chunks(chunks);
                    if state.processor.is_done() {
                        debug!("upstream sent [DONE]");
                        state.finish();
                    }
                }
                Some(Err(e)) => {
                    warn!("upstream stream failed: {}", e);
                    let error = MessagesStreamEvent::error(UPSTREAM_ERROR_TYPE, e.to_string());
                    state.push_events(&[error]);
                    state.finished = true;
                }
                None => {
                    if state.processor.has_buffered_data() {
                        debug!(
                            "upstream closed with {} unterminated bytes",
                            state.processor.buffered_size()
                        );
                    }
                    state.finish();
                }
            }
        }
    })
}
