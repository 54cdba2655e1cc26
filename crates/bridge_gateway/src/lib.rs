//! Dispatch boundary for the bridgellm conversion core.
//!
//! Writes engine outputs onto hyper responses, runs upstream Chat Completions
//! streams through the delta transformer and serves Responses clients from a
//! Chat Completions provider.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod utils;

pub use config::{GatewayConfig, StreamingConfig};
pub use errors::GatewayError;
pub use handlers::{
    transform_chat_stream, EngineOutput, ProviderInvoker, ResponseHandler, ResponsesPipeline,
};
pub use utils::tracing::init_logging;

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_upstream_chat_stream_served_as_messages_sse() {
        let upstream = stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(
                b"data: {\"id\":\"chatcmpl-5\",\"model\":\"gpt-4o\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"Hi\"}}]}\n\n",
            )),
            Ok(Bytes::from_static(
                b"data: {\"id\":\"chatcmpl-5\",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}],\"usage\":{\"prompt_tokens\":4,\"completion_tokens\":1}}\n\ndata: [DONE]\n\n",
            )),
        ]);

        let config = GatewayConfig::default();
        let response = ResponseHandler::new()
            .into_response(
                EngineOutput::sse(transform_chat_stream(upstream)),
                &config.streaming,
            )
            .unwrap();

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        let names: Vec<&str> = body
            .lines()
            .filter_map(|line| line.strip_prefix("event: "))
            .collect();

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
        assert!(body.contains("\"stop_reason\":\"end_turn\""));
        assert!(body.ends_with("data: {\"type\":\"message_stop\"}\n\n"));
    }
}
