pub mod output_to_input;
pub mod to_anthropic;
pub mod to_responses;
