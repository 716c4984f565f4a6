//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Default upstream gateway endpoint.
pub const DEFAULT_UPSTREAM_URL: &str = "https://rpc.particle.network/evm-chain";

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (host, base port, backpressure).
    pub listener: ListenerConfig,

    /// Upstream gateway settings.
    pub upstream: UpstreamConfig,

    /// Inbound request limits.
    pub limits: LimitsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host every chain listener binds on.
    pub bind_host: String,

    /// Port of the first chain; later chains take the following ports.
    pub base_port: u16,

    /// Maximum concurrent connections per chain listener (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: "127.0.0.1".to_string(),
            base_port: 8545,
            max_connections: 10_000,
        }
    }
}

/// Upstream gateway configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Gateway JSON-RPC endpoint.
    pub base_url: String,

    /// Per-call timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum in-flight calls per chain; excess calls wait.
    pub max_connections: usize,

    /// Project id. Falls back to `PROJECT_ID`.
    pub project_id: Option<String>,

    /// Project server key. Falls back to `PROJECT_SERVER_KEY`.
    pub project_secret: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_URL.to_string(),
            request_timeout_secs: 60,
            max_connections: 100,
            project_id: None,
            project_secret: None,
        }
    }
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_connections", &self.max_connections)
            .field("project_id", &self.project_id)
            .field("project_secret", &self.project_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Inbound request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum size of one inbound request, head and body, in bytes.
    pub max_request_bytes: usize,

    /// Size of each socket read.
    pub read_chunk_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_bytes: 16_384,
            read_chunk_bytes: 8_192,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-connection deadline, first read to response flushed, in seconds.
    pub connection_secs: u64,

    /// Cap on each startup `eth_chainId` check, in seconds.
    pub probe_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connection_secs: 30,
            probe_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
