//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Requested chain ids
//!     → registry.rs (validate, expand `0` to every network)
//!     → types.rs (ChainBinding, UpstreamCredential)
//!     → client.rs (one authenticated client per bound chain)
//!     → upstream gateway (HTTPS POST, Basic auth)
//! ```
//!
//! # Security Constraints
//! - Credentials from arguments, config or environment only
//! - Never log the project secret
//! - The chain id sent upstream is always the binding's, never the caller's

pub mod client;
pub mod registry;
pub mod types;

pub use client::{UpstreamClient, UpstreamClientBuilder};
pub use registry::{ChainRegistry, Network, SUPPORTED_NETWORKS};
pub use types::{
    BlockchainError, BlockchainResult, ChainBinding, ChainId, RpcEnvelope, UpstreamCredential,
};
