use async_trait::async_trait;
use bridgellm::apis::{
    ChatCompletionsRequest, ChatCompletionsResponse, MessagesResponse, ResponsesAPIRequest,
    ResponsesAPIResponse,
};
use bridgellm::{
    convert_responses_request, simulate_stream, ConversionOptions, SseEvent, StageRecorder,
    TransformError,
};
use futures::stream;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::GatewayError;
use crate::handlers::response_handler::EngineOutput;

pub const STAGE_CLIENT_REQUEST: &str = "client_request";
pub const STAGE_UPSTREAM_REQUEST: &str = "upstream_request";
pub const STAGE_UPSTREAM_RESPONSE: &str = "upstream_response";
pub const STAGE_CLIENT_RESPONSE: &str = "client_response";

/// Sends a converted request to whichever provider serves it.
#[async_trait]
pub trait ProviderInvoker: Send + Sync {
    async fn invoke(
        &self,
        request: ChatCompletionsRequest,
    ) -> Result<ChatCompletionsResponse, GatewayError>;
}

/// Serves Responses clients from a Chat Completions provider.
pub struct ResponsesPipeline<P, R> {
    provider: P,
    recorder: R,
    options: ConversionOptions,
}

impl<P, R> ResponsesPipeline<P, R>
where
    P: ProviderInvoker,
    R: StageRecorder,
{
    pub fn new(provider: P, recorder: R, options: ConversionOptions) -> Self {
        Self {
            provider,
            recorder,
            options,
        }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Convert, invoke the provider, and convert the answer back.
    pub async fn handle(
        &self,
        request: &ResponsesAPIRequest,
    ) -> Result<ResponsesAPIResponse, GatewayError> {
        self.record(STAGE_CLIENT_REQUEST, request);

        let chat_request = convert_responses_request(request, &self.options)?;
        info!(
            "forwarding responses request: model={}, messages={}, tools={}",
            chat_request.model,
            chat_request.messages.len(),
            chat_request.tools.as_ref().map_or(0, Vec::len)
        );
        self.record(STAGE_UPSTREAM_REQUEST, &chat_request);

        let chat_response = self.provider.invoke(chat_request).await?;
        self.record(STAGE_UPSTREAM_RESPONSE, &chat_response);

        let response = ResponsesAPIResponse::try_from(&chat_response)?;
        self.record(STAGE_CLIENT_RESPONSE, &response);
        debug!(
            "responses request finished: id={}, status={:?}",
            response.id, response.status
        );
        Ok(response)
    }

    /// Like `handle`, as a JSON body.
    pub async fn respond(&self, request: &ResponsesAPIRequest) -> Result<EngineOutput, GatewayError> {
        let response = self.handle(request).await?;
        let body = serde_json::to_value(&response).map_err(TransformError::from)?;
        Ok(EngineOutput::Json(body))
    }

    /// Replay a complete Chat response as a Messages event stream.
    pub fn simulate(&self, response: &ChatCompletionsResponse) -> Result<EngineOutput, GatewayError> {
        let message = MessagesResponse::from(response);
        let events = simulate_stream(&message, &self.options);
        let frames = SseEvent::from_events(&events)?;
        debug!("simulating stream with {} frames", frames.len());
        Ok(EngineOutput::sse(stream::iter(frames)))
    }

    fn record<T: Serialize>(&self, stage: &str, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(value) => self.recorder.record(stage, &value),
            Err(e) => warn!("failed to snapshot {} stage: {}", stage, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridgellm::apis::openai_responses::ResponseStatus;
    use bridgellm::NoopRecorder;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CannedProvider {
        response: Option<Value>,
        seen: Arc<Mutex<Vec<ChatCompletionsRequest>>>,
    }

    #[async_trait]
    impl ProviderInvoker for CannedProvider {
        async fn invoke(
            &self,
            request: ChatCompletionsRequest,
        ) -> Result<ChatCompletionsResponse, GatewayError> {
            self.seen.lock().unwrap().push(request);
            match &self.response {
                Some(body) => Ok(serde_json::from_value(body.clone()).map_err(TransformError::from)?),
                None => Err(GatewayError::Provider("upstream returned 503".to_string())),
            }
        }
    }

    #[derive(Default, Clone)]
    struct CapturingRecorder {
        stages: Arc<Mutex<Vec<(String, Value)>>>,
    }

    impl StageRecorder for CapturingRecorder {
        fn record(&self, stage: &str, payload: &Value) {
            self.stages
                .lock()
                .unwrap()
                .push((stage.to_string(), payload.clone()));
        }
    }

    fn request(body: Value) -> ResponsesAPIRequest {
        serde_json::from_value(body).unwrap()
    }

    fn tool_call_response() -> Value {
        json!({
            "id": "chatcmpl-7",
            "created": 1700000000,
            "model": "gpt-4o",
            "choices": [{"index": 0, "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{"id": "call_9", "type": "function", "function": {"name": "bash", "arguments": "{\"command\":\"ls\"}"}}]
            }, "finish_reason": "tool_calls"}],
            "usage": {"prompt_tokens": 20, "completion_tokens": 4}
        })
    }

    #[tokio::test]
    async fn test_handle_records_every_stage() {
        let provider = CannedProvider {
            response: Some(tool_call_response()),
            ..Default::default()
        };
        let seen = provider.seen.clone();
        let recorder = CapturingRecorder::default();
        let stages = recorder.stages.clone();
        let pipeline = ResponsesPipeline::new(provider, recorder, ConversionOptions::default());

        let response = pipeline
            .handle(&request(json!({
                "model": "gpt-4o",
                "instructions": "Be brief",
                "input": [{"role": "user", "content": "list files"}],
                "tools": [{"type": "function", "name": "bash", "parameters": {"type": "object", "properties": {"command": {"type": "string"}}}}]
            })))
            .await
            .unwrap();

        assert_eq!(response.id, "resp_chatcmpl-7");
        assert_eq!(response.status, ResponseStatus::InProgress);

        let upstream = &seen.lock().unwrap()[0];
        assert_eq!(upstream.model, "gpt-4o");
        assert!(!upstream.stream);
        assert_eq!(upstream.messages.len(), 2);
        assert_eq!(upstream.tools.as_ref().map(Vec::len), Some(1));

        let stages = stages.lock().unwrap();
        let names: Vec<&str> = stages.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "client_request",
                "upstream_request",
                "upstream_response",
                "client_response"
            ]
        );
        assert_eq!(stages[3].1["required_action"]["type"], "submit_tool_outputs");
    }

    #[tokio::test]
    async fn test_validation_error_never_reaches_provider() {
        let provider = CannedProvider::default();
        let seen = provider.seen.clone();
        let pipeline = ResponsesPipeline::new(provider, NoopRecorder, ConversionOptions::default());

        let err = pipeline
            .handle(&request(json!({"model": "gpt-4o", "input": []})))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), hyper::StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Input cannot be empty");
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let pipeline = ResponsesPipeline::new(
            CannedProvider::default(),
            NoopRecorder,
            ConversionOptions::default(),
        );

        let err = pipeline
            .handle(&request(json!({"model": "gpt-4o", "input": "hi"})))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Provider(_)));
        assert_eq!(err.status_code(), hyper::StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_respond_returns_json_body() {
        let provider = CannedProvider {
            response: Some(json!({
                "id": "chatcmpl-1",
                "model": "gpt-4o",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hello"}, "finish_reason": "stop"}]
            })),
            ..Default::default()
        };
        let pipeline = ResponsesPipeline::new(provider, NoopRecorder, ConversionOptions::default());

        let output = pipeline
            .respond(&request(json!({"model": "gpt-4o", "input": "hi"})))
            .await
            .unwrap();
        let EngineOutput::Json(body) = output else {
            panic!("expected a JSON body");
        };
        assert_eq!(body["output_text"], "Hello");
        assert_eq!(body["status"], "completed");
    }

    #[tokio::test]
    async fn test_simulate_replays_tool_call() {
        let pipeline = ResponsesPipeline::new(
            CannedProvider::default(),
            NoopRecorder,
            ConversionOptions::default(),
        );
        let chat: ChatCompletionsResponse = serde_json::from_value(tool_call_response()).unwrap();

        let EngineOutput::Sse(events) = pipeline.simulate(&chat).unwrap() else {
            panic!("expected an event stream");
        };
        let frames: Vec<SseEvent> = events.collect().await;
        let names: Vec<&str> = frames.iter().map(|frame| frame.event.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "message_start",
                "content_block_start",
                "content_block_delta",
                "content_block_stop",
                "message_delta",
                "message_stop",
            ]
        );
        assert_eq!(frames[0].data["message"]["id"], "chatcmpl-7");
        assert_eq!(frames[0].data["message"]["usage"]["input_tokens"], 20);
        assert_eq!(frames[1].data["content_block"]["name"], "bash");
        assert_eq!(
            frames[2].data["delta"]["partial_json"],
            "{\"command\":\"ls\"}"
        );
        assert_eq!(frames[4].data["delta"]["stop_reason"], "tool_use");
    }
}
