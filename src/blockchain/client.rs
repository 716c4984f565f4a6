//! Authenticated JSON-RPC client for the upstream gateway.
//!
//! # Responsibilities
//! - Wrap each call in a JSON-RPC 2.0 envelope carrying the bound chain id
//! - POST over a pooled keep-alive connection with Basic auth
//! - Bound in-flight calls per chain; excess calls queue
//! - Map transport and status failures to the error taxonomy
//!
//! No retries happen here: every call is a single attempt.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::IgnoredAny;
use serde_json::Value;
use tokio::sync::Semaphore;
use url::Url;

use crate::blockchain::registry::ChainRegistry;
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ChainId, RpcEnvelope, UpstreamCredential,
};
use crate::config::UpstreamConfig;
use crate::observability::metrics;

/// Label used for chains absent from the registry.
const UNKNOWN_CHAIN: &str = "unknown";

/// Builder for [`UpstreamClient`].
///
/// Credentials are taken from, in order: an explicit shared credential, the
/// explicit project id/secret, the environment.
#[derive(Debug, Clone, Default)]
pub struct UpstreamClientBuilder {
    chain_id: Option<ChainId>,
    chain_name: Option<String>,
    credential: Option<Arc<UpstreamCredential>>,
    project_id: Option<String>,
    project_secret: Option<String>,
    config: UpstreamConfig,
    registry: ChainRegistry,
}

impl UpstreamClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to an explicit chain id. `0` counts as unset.
    pub fn chain_id(mut self, chain_id: ChainId) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Bind by registry name; only used when no chain id is set.
    pub fn chain_name(mut self, name: impl Into<String>) -> Self {
        self.chain_name = Some(name.into());
        self
    }

    pub fn credential(mut self, credential: Arc<UpstreamCredential>) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn project_secret(mut self, project_secret: impl Into<String>) -> Self {
        self.project_secret = Some(project_secret.into());
        self
    }

    pub fn config(mut self, config: UpstreamConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(mut self, registry: ChainRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn build(self) -> BlockchainResult<UpstreamClient> {
        let credential = match self.credential {
            Some(credential) => credential,
            None => Arc::new(UpstreamCredential::resolve(
                self.project_id.or_else(|| self.config.project_id.clone()),
                self.project_secret.or_else(|| self.config.project_secret.clone()),
            )?),
        };

        let chain_id = match (self.chain_id.filter(|id| *id != ChainId::ALL), self.chain_name) {
            (Some(chain_id), _) => chain_id,
            (None, Some(name)) => self.registry.name_to_id(&name)?,
            (None, None) => return Err(BlockchainError::NoChainSpecified),
        };
        let chain_name = self.registry.id_to_name(chain_id).unwrap_or(UNKNOWN_CHAIN);

        let base_url = Url::parse(&self.config.base_url).map_err(|e| {
            BlockchainError::Client(format!("invalid base URL '{}': {}", self.config.base_url, e))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let max_connections = self.config.max_connections.max(1);
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(self.config.request_timeout_secs))
            .pool_max_idle_per_host(max_connections)
            .build()
            .map_err(|e| BlockchainError::Client(e.to_string()))?;

        Ok(UpstreamClient {
            http,
            base_url,
            chain_id,
            chain_name,
            credential,
            in_flight: Semaphore::new(max_connections),
        })
    }
}

/// Forwards JSON-RPC calls for one fixed chain.
///
/// Owned by exactly one chain listener and shared by its connection tasks.
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: Url,
    chain_id: ChainId,
    chain_name: &'static str,
    credential: Arc<UpstreamCredential>,
    /// Caps concurrent calls at the pool size.
    in_flight: Semaphore,
}

impl UpstreamClient {
    pub fn builder() -> UpstreamClientBuilder {
        UpstreamClientBuilder::new()
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn chain_name(&self) -> &'static str {
        self.chain_name
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Forward one call and return the gateway's JSON response object.
    pub async fn call(&self, method: &str, params: &[Value]) -> BlockchainResult<Value> {
        let body = self.post(method, params).await?;
        serde_json::from_slice(&body).map_err(|e| BlockchainError::InvalidResponse(e.to_string()))
    }

    /// Forward one call and return the gateway's response body as sent.
    ///
    /// The body is checked to be well-formed JSON but never re-encoded.
    pub async fn forward(&self, method: &str, params: &[Value]) -> BlockchainResult<Vec<u8>> {
        let body = self.post(method, params).await?;
        serde_json::from_slice::<IgnoredAny>(&body)
            .map_err(|e| BlockchainError::InvalidResponse(e.to_string()))?;
        Ok(body)
    }

    /// One authenticated POST. Non-2xx statuses become `UpstreamHttp`.
    async fn post(&self, method: &str, params: &[Value]) -> BlockchainResult<Vec<u8>> {
        let _permit = self
            .in_flight
            .acquire()
            .await
            .map_err(|_| BlockchainError::UpstreamUnavailable("client closed".to_string()))?;

        let envelope = RpcEnvelope::new(self.chain_id, method, params);
        let started = Instant::now();

        let response = self
            .http
            .post(self.base_url.clone())
            .basic_auth(&self.credential.project_id, Some(&self.credential.project_secret))
            .json(&envelope)
            .send()
            .await
            .map_err(|e| BlockchainError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| BlockchainError::UpstreamUnavailable(e.to_string()))?;

        metrics::record_upstream_duration(self.chain_name, started.elapsed().as_secs_f64());
        tracing::debug!(
            chain_id = %self.chain_id,
            method,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Upstream call finished"
        );

        if !status.is_success() {
            return Err(BlockchainError::UpstreamHttp {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(body.to_vec())
    }

    /// Ask the gateway which chain it serves for this binding (`eth_chainId`).
    pub async fn remote_chain_id(&self) -> BlockchainResult<ChainId> {
        let response = self.call("eth_chainId", &[]).await?;
        parse_chain_id_response(&response)
    }

    /// Check that the gateway agrees on the bound chain id.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let actual = self.remote_chain_id().await?;
        if actual != self.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.chain_id,
                actual,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("base_url", &self.base_url.as_str())
            .field("chain_id", &self.chain_id)
            .field("chain_name", &self.chain_name)
            .field("available_permits", &self.in_flight.available_permits())
            .finish()
    }
}

/// Decode the `result` of an `eth_chainId` response (hex quantity).
fn parse_chain_id_response(response: &Value) -> BlockchainResult<ChainId> {
    if let Some(error) = response.get("error") {
        return Err(BlockchainError::InvalidResponse(format!("eth_chainId failed: {error}")));
    }

    let result = response
        .get("result")
        .ok_or_else(|| BlockchainError::InvalidResponse("missing result".to_string()))?;

    let id = match result {
        Value::String(hex) => {
            let digits = hex
                .strip_prefix("0x")
                .or_else(|| hex.strip_prefix("0X"))
                .unwrap_or(hex.as_str());
            u64::from_str_radix(digits, 16).map_err(|e| {
                BlockchainError::InvalidResponse(format!("bad chain id '{hex}': {e}"))
            })?
        }
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| BlockchainError::InvalidResponse(format!("bad chain id {n}")))?,
        other => {
            return Err(BlockchainError::InvalidResponse(format!("bad chain id {other}")));
        }
    };

    Ok(ChainId(id))
}
