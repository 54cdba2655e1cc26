pub mod from_responses;
