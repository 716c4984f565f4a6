//! Request and connection limits.
//!
//! # Responsibilities
//! - Enforce maximum total request size (head + body)
//! - Fix the per-read chunk size
//!
//! # Design Decisions
//! - Limits checked as bytes arrive (early rejection)
//! - Oversized requests are dropped without a response

use crate::config::LimitsConfig;

/// Default ceiling for one inbound request.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 16_384;
/// Default size of one socket read.
pub const DEFAULT_READ_CHUNK_BYTES: usize = 8_192;

/// Size bounds applied while reading one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLimits {
    pub max_request_bytes: usize,
    pub read_chunk_bytes: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            read_chunk_bytes: DEFAULT_READ_CHUNK_BYTES,
        }
    }
}

impl From<&LimitsConfig> for RequestLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self {
            max_request_bytes: config.max_request_bytes,
            read_chunk_bytes: config.read_chunk_bytes.max(1),
        }
    }
}

impl RequestLimits {
    /// Whether `total` bytes still fit.
    pub fn allows(&self, total: usize) -> bool {
        total <= self.max_request_bytes
    }
}
