//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection on a chain's port
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (id, lifecycle tracking)
//!     → Hand off to http::ConnectionHandler in its own task
//!
//! Connection States:
//!     Reading → Decoding → Forwarding → Responding → Closed
//! ```
//!
//! # Design Decisions
//! - One listener per chain; a listener never serves another chain
//! - Bounded concurrency per listener prevents resource exhaustion
//! - A failing connection never takes its listener down

pub mod connection;
pub mod listener;

pub use connection::{ConnectionId, ConnectionState, ConnectionTracker};
pub use listener::{ChainListener, ListenerError};
