pub mod pipeline;
pub mod response_handler;
pub mod stream_transform;

pub use pipeline::{ProviderInvoker, ResponsesPipeline};
pub use response_handler::{EngineOutput, ResponseHandler, SseEventStream};
pub use stream_transform::transform_chat_stream;
