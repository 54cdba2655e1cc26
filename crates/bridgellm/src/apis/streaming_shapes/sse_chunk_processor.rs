use crate::apis::openai::ChatCompletionsStreamResponse;
use crate::apis::streaming_shapes::sse::{SseLine, SseStreamIter};
use log::debug;

/// Stateful processor for upstream Chat Completions SSE bytes.
///
/// Network reads split lines arbitrarily, so the trailing partial line of
/// every chunk is buffered and prepended to the next one.
#[derive(Debug, Default)]
pub struct SseChunkProcessor {
    /// Bytes after the last newline seen so far
    incomplete_line_buffer: Vec<u8>,
    done: bool,
}

impl SseChunkProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a chunk of SSE data, handling lines split across chunk boundaries.
    ///
    /// Returns every chunk object completed by this read. Undecodable payloads
    /// are skipped; nothing after `[DONE]` is returned.
    pub fn process_bytes(&mut self, chunk: &[u8]) -> Vec<ChatCompletionsStreamResponse> {
        if self.done {
            return Vec::new();
        }

        self.incomplete_line_buffer.extend_from_slice(chunk);
        let Some(last_newline) = self
            .incomplete_line_buffer
            .iter()
            .rposition(|byte| *byte == b'\n')
        else {
            return Vec::new();
        };

        let remainder = self.incomplete_line_buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.incomplete_line_buffer, remainder);
        self.decode_lines(&complete)
    }

    /// Treat whatever is still buffered as a final, complete line.
    pub fn flush(&mut self) -> Vec<ChatCompletionsStreamResponse> {
        let rest = std::mem::take(&mut self.incomplete_line_buffer);
        if self.done || rest.is_empty() {
            return Vec::new();
        }
        self.decode_lines(&rest)
    }

    /// Whether the upstream sent its `[DONE]` sentinel.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Check if there are buffered incomplete bytes
    pub fn has_buffered_data(&self) -> bool {
        !self.incomplete_line_buffer.is_empty()
    }

    /// Get the size of buffered incomplete data (for debugging/logging)
    pub fn buffered_size(&self) -> usize {
        self.incomplete_line_buffer.len()
    }

    fn decode_lines(&mut self, bytes: &[u8]) -> Vec<ChatCompletionsStreamResponse> {
        let text = String::from_utf8_lossy(bytes);
        let mut chunks = Vec::new();

        for line in SseStreamIter::new(text.lines()) {
            if line.is_done() {
                self.done = true;
                break;
            }
            match line {
                SseLine::Data(payload) => {
                    match ChatCompletionsStreamResponse::try_from(payload.as_bytes()) {
                        Ok(chunk) => chunks.push(chunk),
                        Err(e) => debug!("skipping undecodable stream chunk: {}", e),
                    }
                }
                SseLine::Event(name) => debug!("ignoring upstream event line: {}", name),
            }
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CHUNK_A: &[u8] = b"data: {\"id\":\"chatcmpl-123\",\"object\":\"chat.completion.chunk\",\"created\":1234567890,\"model\":\"gpt-4o\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"A\"},\"finish_reason\":null}]}\n\n";

    #[test]
    fn test_complete_events_process_immediately() {
        let mut processor = SseChunkProcessor::new();
        let chunks = processor.process_bytes(CHUNK_A);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].choices[0].delta.content.as_deref(), Some("A"));
        assert!(!processor.has_buffered_data());
        assert!(!processor.is_done());
    }

    #[test]
    fn test_split_line_buffered_and_completed() {
        let mut processor = SseChunkProcessor::new();
        let (first, second) = CHUNK_A.split_at(40);

        assert!(processor.process_bytes(first).is_empty());
        assert!(processor.has_buffered_data());
        assert_eq!(processor.buffered_size(), 40);

        let chunks = processor.process_bytes(second);
        assert_eq!(chunks.len(), 1);
        assert!(!processor.has_buffered_data());
    }

    #[test]
    fn test_split_inside_multibyte_character() {
        let payload = "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"héllo\"}}]}\n\n";
        let bytes = payload.as_bytes();
        let split = payload.find('é').unwrap() + 1;

        let mut processor = SseChunkProcessor::new();
        assert!(processor.process_bytes(&bytes[..split]).is_empty());
        let chunks = processor.process_bytes(&bytes[split..]);
        assert_eq!(chunks[0].choices[0].delta.content.as_deref(), Some("héllo"));
    }

    #[test]
    fn test_done_stops_processing() {
        let mut processor = SseChunkProcessor::new();
        let mut transcript = CHUNK_A.to_vec();
        transcript.extend_from_slice(b"data: [DONE]\n\n");
        transcript.extend_from_slice(CHUNK_A);

        let chunks = processor.process_bytes(&transcript);
        assert_eq!(chunks.len(), 1);
        assert!(processor.is_done());
        assert!(processor.process_bytes(CHUNK_A).is_empty());
    }

    #[test]
    fn test_garbage_payload_skipped() {
        let mut processor = SseChunkProcessor::new();
        let mut transcript = b"data: not json\n\n: keep-alive\n\n".to_vec();
        transcript.extend_from_slice(CHUNK_A);

        let chunks = processor.process_bytes(&transcript);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_flush_trailing_line_without_newline() {
        let mut processor = SseChunkProcessor::new();
        let unterminated = &CHUNK_A[..CHUNK_A.len() - 2];

        assert!(processor.process_bytes(unterminated).is_empty());
        let chunks = processor.flush();
        assert_eq!(chunks.len(), 1);
        assert!(!processor.has_buffered_data());
    }
}
