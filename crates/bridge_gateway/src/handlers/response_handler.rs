use std::pin::Pin;

use bridgellm::apis::MessagesStreamEvent;
use bridgellm::SseEvent;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::Frame;
use hyper::{Response, StatusCode};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::config::StreamingConfig;
use crate::errors::GatewayError;

pub const TIMEOUT_ERROR_TYPE: &str = "timeout_error";

pub type SseEventStream = Pin<Box<dyn Stream<Item = SseEvent> + Send>>;

/// What a conversion produced for the client.
pub enum EngineOutput {
    /// A materialized body
    Json(Value),
    /// Frames to be written as they become available
    Sse(SseEventStream),
}

impl EngineOutput {
    pub fn sse<S>(events: S) -> Self
    where
        S: Stream<Item = SseEvent> + Send + 'static,
    {
        EngineOutput::Sse(Box::pin(events))
    }
}

/// Service for handling HTTP responses and streaming
pub struct ResponseHandler;

impl ResponseHandler {
    pub fn new() -> Self {
        Self
    }

    /// Create a full response body from bytes
    pub fn create_full_body<T: Into<Bytes>>(chunk: T) -> BoxBody<Bytes, hyper::Error> {
        Full::new(chunk.into())
            .map_err(|never| match never {})
            .boxed()
    }

    /// Write an engine output onto an HTTP response.
    pub fn into_response(
        &self,
        output: EngineOutput,
        config: &StreamingConfig,
    ) -> Result<Response<BoxBody<Bytes, hyper::Error>>, GatewayError> {
        match output {
            EngineOutput::Json(body) => Self::create_json_response(&body),
            EngineOutput::Sse(events) => self.create_streaming_response(events, config),
        }
    }

    pub fn create_json_response(
        body: &Value,
    ) -> Result<Response<BoxBody<Bytes, hyper::Error>>, GatewayError> {
        Response::builder()
            .status(StatusCode::OK)
            .header(hyper::header::CONTENT_TYPE, "application/json")
            .body(Self::create_full_body(body.to_string()))
            .map_err(GatewayError::from)
    }

    /// Stream frames to the client from a spawned task.
    ///
    /// The stream ends after a terminal frame, when the source is exhausted,
    /// or with an `error` frame once the idle or total timeout elapses.
    pub fn create_streaming_response(
        &self,
        events: SseEventStream,
        config: &StreamingConfig,
    ) -> Result<Response<BoxBody<Bytes, hyper::Error>>, GatewayError> {
        let (tx, rx) = mpsc::channel::<Bytes>(16);

        tokio::spawn(forward_events(events, tx, config.clone()));

        let stream = ReceiverStream::new(rx).map(|chunk| Ok::<_, hyper::Error>(Frame::data(chunk)));
        let stream_body = BoxBody::new(StreamBody::new(stream));

        Response::builder()
            .status(StatusCode::OK)
            .header(hyper::header::CONTENT_TYPE, "text/event-stream")
            .header(hyper::header::CACHE_CONTROL, "no-cache")
            .body(stream_body)
            .map_err(GatewayError::from)
    }
}

impl Default for ResponseHandler {
    fn default() -> Self {
        Self::new()
    }
}

enum Step {
    Event(Option<SseEvent>),
    TotalTimeout,
    IdleTimeout,
    Heartbeat,
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn forward_events(mut events: SseEventStream, tx: mpsc::Sender<Bytes>, config: StreamingConfig) {
    let started = Instant::now();
    let total_deadline = started + config.total_timeout();
    let heartbeat = config.heartbeat_interval();
    let mut last_event = started;
    let mut last_sent = started;
    let mut forwarded = 0usize;

    loop {
        let idle_deadline = last_event + config.idle_timeout();
        let heartbeat_deadline = heartbeat.map(|interval| last_sent + interval);

        let step = tokio::select! {
            biased;
            event = events.next() => Step::Event(event),
            _ = sleep_until(total_deadline) => Step::TotalTimeout,
            _ = sleep_until(idle_deadline) => Step::IdleTimeout,
            _ = sleep_until_opt(heartbeat_deadline) => Step::Heartbeat,
        };

        let (frame, last) = match step {
            Step::Event(Some(event)) => {
                last_event = Instant::now();
                forwarded += 1;
                let terminal = event.is_terminal();
                (Ok(event), terminal)
            }
            Step::Event(None) => break,
            Step::Heartbeat => (SseEvent::try_from(&MessagesStreamEvent::Ping), false),
            Step::IdleTimeout => {
                warn!(
                    "no upstream event for {} ms, closing stream",
                    config.idle_timeout_ms
                );
                let message = format!("stream idle for more than {} ms", config.idle_timeout_ms);
                let error = MessagesStreamEvent::error(TIMEOUT_ERROR_TYPE, message);
                (SseEvent::try_from(&error), true)
            }
            Step::TotalTimeout => {
                warn!(
                    "stream exceeded total timeout of {} ms, closing stream",
                    config.total_timeout_ms
                );
                let message = format!(
                    "stream exceeded total timeout of {} ms",
                    config.total_timeout_ms
                );
                let error = MessagesStreamEvent::error(TIMEOUT_ERROR_TYPE, message);
                (SseEvent::try_from(&error), true)
            }
        };

        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!("failed to encode stream frame, closing stream: {}", e);
                break;
            }
        };

        if tx.send(Bytes::from(frame)).await.is_err() {
            debug!("client disconnected after {} events", forwarded);
            return;
        }
        last_sent = Instant::now();

        if last {
            break;
        }
    }

    info!(
        "stream finished: events={}, elapsed_ms={}",
        forwarded,
        started.elapsed().as_millis()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn config(idle_ms: u64, total_ms: u64, heartbeat_ms: u64) -> StreamingConfig {
        StreamingConfig {
            idle_timeout_ms: idle_ms,
            total_timeout_ms: total_ms,
            heartbeat_interval_ms: heartbeat_ms,
        }
    }

    fn text_frame(text: &str) -> SseEvent {
        SseEvent::new(
            "content_block_delta",
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": text}}),
        )
    }

    fn stop_frame() -> SseEvent {
        SseEvent::new("message_stop", json!({"type": "message_stop"}))
    }

    async fn body_text(response: Response<BoxBody<Bytes, hyper::Error>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn event_names(body: &str) -> Vec<&str> {
        body.lines()
            .filter_map(|line| line.strip_prefix("event: "))
            .collect()
    }

    #[tokio::test]
    async fn test_json_output() {
        let handler = ResponseHandler::new();
        let response = handler
            .into_response(
                EngineOutput::Json(json!({"id": "resp_1", "object": "response"})),
                &StreamingConfig::default(),
            )
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body, json!({"id": "resp_1", "object": "response"}));
    }

    #[tokio::test]
    async fn test_sse_output_frames_in_order() {
        let handler = ResponseHandler::new();
        let frames = vec![text_frame("Hel"), text_frame("lo"), stop_frame()];
        let expected: String = frames.iter().map(ToString::to_string).collect();

        let response = handler
            .into_response(
                EngineOutput::sse(stream::iter(frames)),
                &StreamingConfig::default(),
            )
            .unwrap();

        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/event-stream"
        );
        assert_eq!(response.headers().get("cache-control").unwrap(), "no-cache");
        assert_eq!(body_text(response).await, expected);
    }

    #[tokio::test]
    async fn test_nothing_forwarded_after_terminal_frame() {
        let handler = ResponseHandler::new();
        let frames = vec![stop_frame(), text_frame("late")];
        let response = handler
            .into_response(EngineOutput::sse(stream::iter(frames)), &config(1000, 5000, 0))
            .unwrap();

        let body = body_text(response).await;
        assert_eq!(event_names(&body), vec!["message_stop"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_timeout_ends_with_error_frame() {
        let handler = ResponseHandler::new();
        let events = stream::iter(vec![text_frame("Hi")]).chain(stream::pending());
        let response = handler
            .into_response(EngineOutput::sse(events), &config(1000, 60_000, 0))
            .unwrap();

        let body = body_text(response).await;
        assert_eq!(event_names(&body), vec!["content_block_delta", "error"]);
        assert!(body.contains("\"type\":\"timeout_error\""));
        assert!(body.contains("stream idle for more than 1000 ms"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_timeout_ends_with_error_frame() {
        let handler = ResponseHandler::new();
        // A steady trickle that never trips the idle timeout
        let events = stream::unfold(0u32, |n| async move {
            tokio::time::sleep(Duration::from_millis(400)).await;
            Some((text_frame(&n.to_string()), n + 1))
        });
        let response = handler
            .into_response(EngineOutput::sse(events), &config(1000, 1000, 0))
            .unwrap();

        let body = body_text(response).await;
        assert_eq!(
            event_names(&body),
            vec!["content_block_delta", "content_block_delta", "error"]
        );
        assert!(body.contains("stream exceeded total timeout of 1000 ms"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeats_while_source_is_quiet() {
        let handler = ResponseHandler::new();
        let delayed = stream::once(async {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            stop_frame()
        });
        let events = stream::iter(vec![text_frame("Hi")]).chain(delayed);
        let response = handler
            .into_response(EngineOutput::sse(events), &config(60_000, 600_000, 1000))
            .unwrap();

        let body = body_text(response).await;
        assert_eq!(
            event_names(&body),
            vec!["content_block_delta", "ping", "ping", "message_stop"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_and_heartbeat_frames_use_event_model() {
        let handler = ResponseHandler::new();
        let events = stream::iter(vec![text_frame("Hi")]).chain(stream::pending());
        let response = handler
            .into_response(EngineOutput::sse(events), &config(1500, 60_000, 1000))
            .unwrap();

        let body = body_text(response).await;
        let frames: Vec<&str> = body.split_terminator("\n\n").collect();
        assert_eq!(frames.len(), 3);

        let ping = SseEvent::try_from(&MessagesStreamEvent::Ping).unwrap();
        assert_eq!(format!("{}\n\n", frames[1]), ping.to_string());

        let timeout = SseEvent::try_from(&MessagesStreamEvent::error(
            TIMEOUT_ERROR_TYPE,
            "stream idle for more than 1500 ms",
        ))
        .unwrap();
        assert_eq!(format!("{}\n\n", frames[2]), timeout.to_string());
    }
}
