//! Chain-specific types and error definitions.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Sentinel requesting every supported network.
    pub const ALL: ChainId = ChainId(0);
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chain resolved against the registry and assigned a local port.
///
/// Immutable for the lifetime of its listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBinding {
    pub chain_id: ChainId,
    pub chain_name: &'static str,
    pub port: u16,
}

impl fmt::Display for ChainBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) on port {}", self.chain_name, self.chain_id, self.port)
    }
}

/// Project credentials for the upstream gateway.
///
/// Loaded once at startup and shared read-only by every upstream client.
#[derive(Clone, PartialEq, Eq)]
pub struct UpstreamCredential {
    pub project_id: String,
    pub project_secret: String,
}

/// Environment variable holding the project id.
pub const PROJECT_ID_ENV: &str = "PROJECT_ID";
/// Environment variable holding the project server key.
pub const PROJECT_SECRET_ENV: &str = "PROJECT_SERVER_KEY";

impl UpstreamCredential {
    /// Resolve credentials from explicit values, falling back to the process environment.
    pub fn resolve(
        project_id: Option<String>,
        project_secret: Option<String>,
    ) -> BlockchainResult<Self> {
        Self::resolve_with(project_id, project_secret, |key| std::env::var(key).ok())
    }

    /// Resolve credentials using `lookup` for the environment fallback.
    ///
    /// Empty strings are treated as absent.
    pub fn resolve_with<F>(
        project_id: Option<String>,
        project_secret: Option<String>,
        lookup: F,
    ) -> BlockchainResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let project_id = non_empty(project_id).or_else(|| non_empty(lookup(PROJECT_ID_ENV)));
        let project_secret =
            non_empty(project_secret).or_else(|| non_empty(lookup(PROJECT_SECRET_ENV)));

        match (project_id, project_secret) {
            (Some(project_id), Some(project_secret)) => Ok(Self {
                project_id,
                project_secret,
            }),
            _ => Err(BlockchainError::AuthRequired),
        }
    }
}

impl fmt::Debug for UpstreamCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamCredential")
            .field("project_id", &self.project_id)
            .field("project_secret", &"<redacted>")
            .finish()
    }
}

/// JSON-RPC 2.0 envelope sent to the gateway.
///
/// `chain_id` always comes from the client's binding, never from the caller.
#[derive(Debug, Serialize)]
pub struct RpcEnvelope<'a> {
    pub jsonrpc: &'static str,
    #[serde(rename = "chainId")]
    pub chain_id: ChainId,
    pub method: &'a str,
    pub params: &'a [Value],
    pub id: u64,
}

impl<'a> RpcEnvelope<'a> {
    pub fn new(chain_id: ChainId, method: &'a str, params: &'a [Value]) -> Self {
        Self {
            jsonrpc: "2.0",
            chain_id,
            method,
            params,
            id: 1,
        }
    }
}

/// Errors that can occur while resolving chains or talking to the gateway.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// Project id or secret missing after checking arguments and environment.
    #[error("upstream credentials required: set PROJECT_ID and PROJECT_SERVER_KEY or pass them explicitly")]
    AuthRequired,

    /// Neither a chain id nor a chain name was given.
    #[error("must specify either a chain name or a chain id")]
    NoChainSpecified,

    /// No registry entry matches the given name.
    #[error("unsupported chain name: {0}")]
    UnsupportedChainName(String),

    /// Gateway answered with a non-2xx status.
    #[error("upstream returned HTTP {status}: {body}")]
    UpstreamHttp { status: u16, body: String },

    /// Gateway could not be reached or the call timed out.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Gateway answered 2xx with a body that is not JSON.
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),

    /// Probe returned a different chain than the one bound.
    #[error("chain id mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: ChainId, actual: ChainId },

    /// HTTP client could not be constructed.
    #[error("failed to build upstream client: {0}")]
    Client(String),
}

impl BlockchainError {
    /// Whether this error must abort the process at startup.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Self::AuthRequired | Self::NoChainSpecified | Self::UnsupportedChainName(_) | Self::Client(_)
        )
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;
