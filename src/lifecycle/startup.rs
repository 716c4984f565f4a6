//! Startup orchestration.
//!
//! # Responsibilities
//! - Expand the requested chain ids against the registry
//! - Build one upstream client per chain before binding anything
//! - Probe every chain once for diagnostics, concurrently and time-capped
//! - Bind one listener per chain on consecutive ports and own their tasks
//!
//! # Design Decisions
//! - Fail fast: credential, chain and bind errors are fatal
//! - Probes are advisory: a failed or mismatched probe is logged only
//! - Duplicate chain ids are served on separate ports, as requested

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::blockchain::{
    BlockchainError, ChainBinding, ChainId, ChainRegistry, UpstreamClient, UpstreamCredential,
};
use crate::config::ProxyConfig;
use crate::http::ConnectionHandler;
use crate::lifecycle::shutdown::Shutdown;
use crate::net::{ChainListener, ConnectionTracker, ListenerError};
use crate::observability::metrics;
use crate::security::RequestLimits;

/// Errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Upstream(#[from] BlockchainError),

    #[error("none of the requested chains are supported")]
    NoChains,

    #[error("port range exhausted: base port {base_port} + {offset} exceeds 65535")]
    PortOverflow { base_port: u16, offset: usize },

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// A chain the supervisor is serving.
#[derive(Debug, Clone)]
pub struct RunningChain {
    pub binding: ChainBinding,
    pub local_addr: SocketAddr,
    tracker: ConnectionTracker,
}

impl RunningChain {
    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }
}

/// Starts and owns every chain listener.
pub struct Supervisor {
    config: ProxyConfig,
    registry: ChainRegistry,
    credential: Arc<UpstreamCredential>,
    shutdown: Shutdown,
    listeners: JoinSet<()>,
    chains: Vec<RunningChain>,
}

impl Supervisor {
    /// Resolve credentials from the config, falling back to the environment.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        let credential = UpstreamCredential::resolve(
            config.upstream.project_id.clone(),
            config.upstream.project_secret.clone(),
        )?;
        Ok(Self::with_credential(config, Arc::new(credential)))
    }

    pub fn with_credential(config: ProxyConfig, credential: Arc<UpstreamCredential>) -> Self {
        Self {
            config,
            registry: ChainRegistry::default(),
            credential,
            shutdown: Shutdown::new(),
            listeners: JoinSet::new(),
            chains: Vec::new(),
        }
    }

    /// Use a different network table.
    pub fn with_registry(mut self, registry: ChainRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Chains started so far, in port order.
    pub fn chains(&self) -> &[RunningChain] {
        &self.chains
    }

    /// Start one listener per supported chain in `requested`.
    ///
    /// `[0]` requests every supported network. Ports are assigned
    /// `base_port`, `base_port + 1`, ... in request order.
    pub async fn start(&mut self, requested: &[ChainId]) -> Result<&[RunningChain], StartupError> {
        let networks = self.registry.expand(requested);
        if networks.is_empty() {
            return Err(StartupError::NoChains);
        }
        tracing::info!(
            chains = ?networks.iter().map(|n| n.name).collect::<Vec<_>>(),
            "Starting chain proxies"
        );

        // Every client first: configuration errors must surface before any bind.
        let clients = networks
            .iter()
            .map(|network| {
                UpstreamClient::builder()
                    .chain_id(network.chain_id)
                    .credential(Arc::clone(&self.credential))
                    .config(self.config.upstream.clone())
                    .registry(self.registry)
                    .build()
                    .map(Arc::new)
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Probes run concurrently, each capped at `probe_secs`.
        let probe_timeout = Duration::from_secs(self.config.timeouts.probe_secs);
        let mut probes = JoinSet::new();
        for client in &clients {
            probes.spawn(probe(Arc::clone(client), probe_timeout));
        }
        while let Some(result) = probes.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Upstream probe task failed");
            }
        }

        let base_port = self.config.listener.base_port;
        let limits = RequestLimits::from(&self.config.limits);
        let timeout = Duration::from_secs(self.config.timeouts.connection_secs);

        for (network, client) in networks.into_iter().zip(clients) {
            let offset = self.chains.len();
            let port = u16::try_from(offset)
                .ok()
                .and_then(|offset| base_port.checked_add(offset))
                .ok_or(StartupError::PortOverflow { base_port, offset })?;

            let binding = ChainBinding {
                chain_id: network.chain_id,
                chain_name: network.name,
                port,
            };
            tracing::info!(chain = binding.chain_name, port, "Starting chain proxy");

            let handler = Arc::new(ConnectionHandler::new(client, limits, timeout));
            let listener = ChainListener::bind(
                &self.config.listener.bind_host,
                binding.clone(),
                handler,
                self.config.listener.max_connections,
            )
            .await?;

            let local_addr = listener.local_addr().map_err(|e| {
                ListenerError::Bind(format!("{}:{}", self.config.listener.bind_host, port), e)
            })?;
            self.chains.push(RunningChain {
                binding,
                local_addr,
                tracker: listener.tracker(),
            });
            self.listeners.spawn(listener.run(self.shutdown.subscribe()));
        }

        tracing::info!(count = self.chains.len(), "Started chain proxies");
        Ok(&self.chains)
    }

    /// Serve until `signal` resolves or every listener has stopped, then shut down.
    pub async fn run_until<F>(mut self, signal: F)
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = signal => tracing::info!("Shutdown requested"),
            _ = join_all(&mut self.listeners) => tracing::warn!("All chain listeners stopped"),
        }
        self.shutdown().await;
    }

    /// Stop accepting, then give open connections one deadline to finish.
    pub async fn shutdown(mut self) {
        let notified = self.shutdown.trigger();
        tracing::info!(listeners = notified, "Stopping chain listeners");
        join_all(&mut self.listeners).await;

        let deadline = Duration::from_secs(self.config.timeouts.connection_secs);
        for chain in &self.chains {
            if !chain.tracker.wait_for_idle(deadline).await {
                tracing::warn!(
                    chain = chain.binding.chain_name,
                    open = chain.active_connections(),
                    "Connections still open after drain deadline"
                );
            }
        }
        tracing::info!("Shutdown complete");
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("chains", &self.chains)
            .field("running_listeners", &self.listeners.len())
            .finish()
    }
}

/// One advisory liveness check, bounded by `limit`; never fails startup.
async fn probe(client: Arc<UpstreamClient>, limit: Duration) {
    let verified = match tokio::time::timeout(limit, client.verify_chain_id()).await {
        Ok(verified) => verified,
        Err(_) => Err(BlockchainError::UpstreamUnavailable(format!(
            "no answer within {}s",
            limit.as_secs()
        ))),
    };
    match verified {
        Ok(()) => {
            tracing::info!(
                chain = client.chain_name(),
                chain_id = %client.chain_id(),
                "Upstream connection verified"
            );
            metrics::record_chain_probe(client.chain_name(), true);
        }
        Err(e) => {
            tracing::warn!(
                chain = client.chain_name(),
                chain_id = %client.chain_id(),
                error = %e,
                "Upstream probe failed, starting listener anyway"
            );
            metrics::record_chain_probe(client.chain_name(), false);
        }
    }
}

async fn join_all(listeners: &mut JoinSet<()>) {
    while let Some(result) = listeners.join_next().await {
        if let Err(e) = result {
            tracing::error!(error = %e, "Chain listener task failed");
        }
    }
}
