//! Per-connection handler.
//!
//! # Responsibilities
//! - Drive one connection through Reading → Decoding → Forwarding →
//!   Responding → Closed
//! - Bound the whole lifecycle by one deadline
//! - Answer at most once, always with `Connection: close`
//! - Contain every failure inside the connection
//!
//! # Failure policy
//! - Oversized, malformed or unreadable requests: close, no response
//! - Undecodable body or upstream failure: fixed 500, cause logged
//! - Deadline elapsed: close, whatever the state

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::blockchain::{BlockchainError, UpstreamClient};
use crate::http::request::{read_request, RequestError};
use crate::http::response::Reply;
use crate::net::connection::{ConnectionId, ConnectionState};
use crate::observability::metrics;
use crate::security::RequestLimits;

/// Default whole-connection deadline.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// The JSON-RPC fields the proxy reads from a request body.
///
/// Anything else, including `chainId`, is ignored.
#[derive(Debug, Deserialize)]
pub struct InboundCall {
    pub method: String,
    pub params: Vec<Value>,
}

/// Failures that still earn the client a 500.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("could not decode request body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Upstream(#[from] BlockchainError),
}

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
    /// A response with this status was written.
    Responded(u16),
    /// Request unreadable; closed without a response.
    Aborted,
    /// Deadline elapsed; closed.
    TimedOut,
    /// The response could not be written.
    WriteFailed,
}

impl ConnectionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Responded(200) => "ok",
            Self::Responded(_) => "error",
            Self::Aborted => "aborted",
            Self::TimedOut => "timeout",
            Self::WriteFailed => "write_failed",
        }
    }
}

/// Serves connections for one chain. Cheap to share via `Arc`.
#[derive(Debug)]
pub struct ConnectionHandler {
    upstream: Arc<UpstreamClient>,
    limits: RequestLimits,
    timeout: Duration,
}

impl ConnectionHandler {
    pub fn new(upstream: Arc<UpstreamClient>, limits: RequestLimits, timeout: Duration) -> Self {
        Self {
            upstream,
            limits,
            timeout,
        }
    }

    pub fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }

    /// Serve one connection to completion. The stream is dropped on return.
    pub async fn handle<S>(&self, mut stream: S, id: ConnectionId) -> ConnectionOutcome
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let outcome = match tokio::time::timeout(self.timeout, self.drive(&mut stream, id)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    connection_id = %id,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Connection deadline elapsed, closing"
                );
                ConnectionOutcome::TimedOut
            }
        };

        tracing::debug!(
            connection_id = %id,
            state = %ConnectionState::Closed,
            outcome = outcome.label(),
            "Connection finished"
        );
        metrics::record_request(self.upstream.chain_name(), outcome.label());
        outcome
    }

    async fn drive<S>(&self, stream: &mut S, id: ConnectionId) -> ConnectionOutcome
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        enter(id, ConnectionState::Reading);
        let body = match read_request(stream, &self.limits).await {
            Ok(body) => body,
            Err(e) => {
                match &e {
                    RequestError::Io(_) => tracing::debug!(connection_id = %id, error = %e, "Read failed"),
                    _ => tracing::warn!(connection_id = %id, error = %e, "Dropping request"),
                }
                return ConnectionOutcome::Aborted;
            }
        };

        let reply = match self.exchange(&body, id).await {
            Ok(response) => Reply::Json(response),
            Err(e) => {
                tracing::error!(connection_id = %id, error = %e, "Error processing request");
                Reply::ServerError
            }
        };

        enter(id, ConnectionState::Responding);
        if let Err(e) = reply.write_to(stream).await {
            tracing::debug!(connection_id = %id, error = %e, "Failed to write response");
            return ConnectionOutcome::WriteFailed;
        }
        let _ = stream.shutdown().await;
        ConnectionOutcome::Responded(reply.status())
    }

    async fn exchange(&self, body: &[u8], id: ConnectionId) -> Result<Vec<u8>, HandlerError> {
        enter(id, ConnectionState::Decoding);
        let call: InboundCall = serde_json::from_slice(body)?;
        tracing::info!(
            connection_id = %id,
            chain_id = %self.upstream.chain_id(),
            method = %call.method,
            "Received request"
        );
        tracing::debug!(connection_id = %id, params = ?call.params, "Request params");

        enter(id, ConnectionState::Forwarding);
        Ok(self.upstream.forward(&call.method, &call.params).await?)
    }
}

fn enter(id: ConnectionId, state: ConnectionState) {
    tracing::trace!(connection_id = %id, state = %state, "Connection state");
}
