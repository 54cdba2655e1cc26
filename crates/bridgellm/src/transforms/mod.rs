//! Structural mapping between API shapes
//!
//! - Responses request → Chat Completions request (`request::from_responses`)
//! - Chat Completions response → Responses response (`response::to_responses`)
//! - Responses output → Chat Completions messages (`response::output_to_input`)
//! - Chat Completions response → Messages response (`response::to_anthropic`)

pub mod lib;
pub mod request;
pub mod response;
pub mod tool_schema;

// Re-export commonly used items for convenience
pub use lib::*;
