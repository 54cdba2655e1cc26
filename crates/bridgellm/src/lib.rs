//! bridgellm: conversion core of a multi-provider LLM gateway.
//!
//! Translates between OpenAI Chat Completions, OpenAI Responses and Anthropic
//! Messages shapes, replays complete messages as Messages SSE events and
//! re-emits live Chat Completions streams as Messages SSE events.

pub mod apis;
pub mod clients;
pub mod config;
pub mod transforms;

// Re-export important types and traits
pub use apis::streaming_shapes::anthropic_streaming_buffer::{
    AnthropicMessagesStreamBuffer, StreamState, ToolCallAccumulator,
};
pub use apis::streaming_shapes::sse::{SseEvent, SseLine, SseStreamIter};
pub use apis::streaming_shapes::sse_chunk_processor::SseChunkProcessor;
pub use apis::streaming_shapes::sse_simulator::simulate_stream;
pub use clients::{NoopRecorder, StageRecorder, TransformError};
pub use config::ConversionOptions;
pub use transforms::request::from_responses::convert_responses_request;
pub use transforms::tool_schema::ToolSchemaMap;
