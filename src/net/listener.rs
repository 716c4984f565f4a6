//! Chain listener: one TCP port serving one chain.
//!
//! # Responsibilities
//! - Bind the chain's port
//! - Accept incoming TCP connections until shutdown
//! - Enforce max_connections limit via semaphore
//! - Spawn an isolated handler task per connection

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};

use crate::blockchain::ChainBinding;
use crate::http::ConnectionHandler;
use crate::net::connection::ConnectionTracker;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Host and port do not form a socket address.
    InvalidAddress(String),
    /// Failed to bind to address.
    Bind(String, std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::InvalidAddress(addr) => write!(f, "Invalid listen address: {}", addr),
            ListenerError::Bind(addr, e) => write!(f, "Failed to bind {}: {}", addr, e),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind(_, e) => Some(e),
            ListenerError::InvalidAddress(_) => None,
        }
    }
}

/// Accepts connections for exactly one chain binding.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is reached,
/// new connections wait in the kernel backlog until a slot frees up.
pub struct ChainListener {
    binding: ChainBinding,
    inner: TcpListener,
    handler: Arc<ConnectionHandler>,
    connection_limit: Arc<Semaphore>,
    tracker: ConnectionTracker,
}

impl ChainListener {
    /// Bind `host:binding.port`.
    pub async fn bind(
        host: &str,
        binding: ChainBinding,
        handler: Arc<ConnectionHandler>,
        max_connections: usize,
    ) -> Result<Self, ListenerError> {
        let address = format!("{}:{}", host, binding.port);
        let addr: SocketAddr = tokio::net::lookup_host(address.as_str())
            .await
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| ListenerError::InvalidAddress(address.clone()))?;

        let inner = TcpListener::bind(addr)
            .await
            .map_err(|e| ListenerError::Bind(address.clone(), e))?;

        tracing::info!(
            address = %addr,
            chain = binding.chain_name,
            chain_id = %binding.chain_id,
            max_connections,
            "Chain listener bound"
        );

        Ok(Self {
            tracker: ConnectionTracker::new(binding.chain_name),
            binding,
            inner,
            handler,
            connection_limit: Arc::new(Semaphore::new(max_connections.max(1))),
        })
    }

    pub fn binding(&self) -> &ChainBinding {
        &self.binding
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Tracker of this listener's open connections.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Get current available connection slots.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    /// Accept loop. Returns when `shutdown` fires; in-flight connections
    /// keep running under their own deadline.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            // Acquire permit first (backpressure)
            let permit = tokio::select! {
                permit = Arc::clone(&self.connection_limit).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = shutdown.recv() => break,
            };

            let (stream, peer_addr) = tokio::select! {
                accepted = self.inner.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(port = self.binding.port, error = %e, "Accept failed");
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        continue;
                    }
                },
                _ = shutdown.recv() => break,
            };

            let guard = self.tracker.track();
            tracing::debug!(
                connection_id = %guard.id(),
                peer_addr = %peer_addr,
                chain = self.binding.chain_name,
                available_permits = self.connection_limit.available_permits(),
                "Connection accepted"
            );

            let handler = Arc::clone(&self.handler);
            tokio::spawn(async move {
                let _permit = permit;
                handler.handle(stream, guard.id()).await;
                drop(guard);
            });
        }

        tracing::info!(
            port = self.binding.port,
            chain = self.binding.chain_name,
            "Chain listener stopped"
        );
    }
}

impl std::fmt::Debug for ChainListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainListener")
            .field("binding", &self.binding)
            .field("local_addr", &self.inner.local_addr().ok())
            .field("available_permits", &self.connection_limit.available_permits())
            .finish()
    }
}
