//! Error types and collaborator interfaces shared by every conversion

use serde_json::{json, Value};
use thiserror::Error;

// ============================================================================
// ERROR TYPES
// ============================================================================

pub const VALIDATION_ERROR_CODE: &str = "validation_error";
pub const SERIALIZATION_ERROR_CODE: &str = "serialization_error";
pub const INTERNAL_ERROR_CODE: &str = "internal_error";

#[derive(Error, Debug)]
pub enum TransformError {
    /// The client request cannot be converted as given (400-class).
    #[error("{0}")]
    Validation(String),
    /// Tool arguments could not be re-encoded after normalization.
    #[error("Serialization failed: {0}")]
    Serialization(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl TransformError {
    pub fn validation(message: impl Into<String>) -> Self {
        TransformError::Validation(message.into())
    }

    /// Stable machine-readable code surfaced to callers.
    pub fn code(&self) -> &'static str {
        match self {
            TransformError::Validation(_) => VALIDATION_ERROR_CODE,
            TransformError::Serialization(_) => SERIALIZATION_ERROR_CODE,
            TransformError::Json(_) | TransformError::Config(_) => INTERNAL_ERROR_CODE,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, TransformError::Validation(_))
    }

    pub fn to_error_body(&self) -> Value {
        error_body(self.code(), &self.to_string())
    }
}

/// `{"error":{"type","code","message"}}`, the body every error response carries.
pub fn error_body(code: &str, message: &str) -> Value {
    json!({
        "error": {
            "type": code,
            "code": code,
            "message": message,
        }
    })
}

// ============================================================================
// COLLABORATORS
// ============================================================================

/// Optional snapshot hook invoked at each conversion stage.
pub trait StageRecorder: Send + Sync {
    fn record(&self, stage: &str, payload: &Value);
}

/// Recorder that discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl StageRecorder for NoopRecorder {
    fn record(&self, _stage: &str, _payload: &Value) {}
}
