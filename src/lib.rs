//! Local per-chain HTTP endpoints for a multi-chain JSON-RPC gateway.
//!
//! Each supported chain gets its own plain HTTP port on the local machine.
//! Tools pointed at `http://127.0.0.1:<port>` reach the remote gateway with
//! credentials and chain selection added by the proxy.

pub mod blockchain;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;

pub use blockchain::{ChainId, ChainRegistry, UpstreamClient};
pub use config::ProxyConfig;
pub use lifecycle::{Shutdown, Supervisor};
