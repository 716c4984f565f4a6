//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted TCP stream
//!     → handler.rs (per-connection state machine, deadline)
//!     → request.rs (read one request head + body, size ceiling)
//!     → [decode {method, params}]
//!     → blockchain::UpstreamClient::call
//!     → response.rs (200 JSON or fixed 500, Connection: close)
//! ```

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{ConnectionHandler, ConnectionOutcome, HandlerError, DEFAULT_CONNECTION_TIMEOUT};
pub use request::{read_request, RequestError};
pub use response::{Reply, SERVER_ERROR_BODY};
