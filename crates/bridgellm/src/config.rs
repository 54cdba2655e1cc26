//! Conversion options
//!
//! Options are plain serde structs so they can be embedded in a larger YAML
//! configuration file. Every field has a default; an empty document is valid.

use serde::{Deserialize, Serialize};

use crate::clients::TransformError;

pub const DEFAULT_SSE_CHUNK_SIZE: usize = 1024;
pub const MIN_SSE_CHUNK_SIZE: usize = 128;
pub const MAX_SSE_CHUNK_SIZE: usize = 4096;
pub const DEFAULT_TEXT_DELIMITER: &str = "\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    /// Maximum bytes of tool input JSON per simulated `input_json_delta`.
    pub sse_chunk_size: usize,
    /// Separator used when flattening multi-part text content.
    pub text_delimiter: String,
    /// Message roles dropped from Responses input items. Never applies to `instructions`.
    pub ignored_roles: Vec<String>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            sse_chunk_size: DEFAULT_SSE_CHUNK_SIZE,
            text_delimiter: DEFAULT_TEXT_DELIMITER.to_string(),
            ignored_roles: Vec::new(),
        }
    }
}

impl ConversionOptions {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, TransformError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| TransformError::Config(e.to_string()))
    }

    pub fn effective_chunk_size(&self) -> usize {
        self.sse_chunk_size
            .clamp(MIN_SSE_CHUNK_SIZE, MAX_SSE_CHUNK_SIZE)
    }

    pub fn ignores_role(&self, role: &str) -> bool {
        self.ignored_roles
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(role))
    }
}
