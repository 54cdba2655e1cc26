use bridgellm::ConversionOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::GatewayError;

pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_TOTAL_TIMEOUT_MS: u64 = 600_000;
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 15_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub conversion: ConversionOptions,
    pub streaming: StreamingConfig,
}

/// Timing policy for SSE responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Longest gap allowed between two upstream events
    pub idle_timeout_ms: u64,
    /// Longest a single stream may stay open
    pub total_timeout_ms: u64,
    /// Ping interval while the source is quiet, 0 disables heartbeats
    pub heartbeat_interval_ms: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            total_timeout_ms: DEFAULT_TOTAL_TIMEOUT_MS,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
        }
    }
}

impl StreamingConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn total_timeout(&self) -> Duration {
        Duration::from_millis(self.total_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_ms > 0).then(|| Duration::from_millis(self.heartbeat_interval_ms))
    }
}

impl GatewayConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, GatewayError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| GatewayError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }
}
