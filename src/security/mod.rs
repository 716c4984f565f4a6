//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request bytes:
//!     → limits.rs (check accumulated size on every read)
//!     → Pass to request parsing
//! ```
//!
//! # Design Decisions
//! - Fail closed: oversized or unparsable input closes the connection
//! - No trust in client input: chain selection never comes from the body

pub mod limits;

pub use limits::RequestLimits;
