pub mod anthropic;
pub mod openai;
pub mod openai_responses;
pub mod streaming_shapes;

// Explicit exports to avoid naming conflicts
pub use anthropic::{MessagesResponse, MessagesStreamEvent};
pub use openai::{ChatCompletionsRequest, ChatCompletionsResponse, ChatCompletionsStreamResponse};
pub use openai::{Message as OpenAIMessage, Tool as OpenAITool, ToolChoice as OpenAIToolChoice};
pub use openai_responses::{ResponsesAPIRequest, ResponsesAPIResponse, ResponsesOutputEnvelope};
