//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Expand chain ids → Build every upstream client → Probe each chain
//!     → Bind base_port + i → Spawn accept loops
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Configuration errors are fatal before any port is bound
//! - Liveness probes are advisory; a failed probe never blocks startup
//! - The supervisor owns its listener tasks; no global registry

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
pub use startup::{RunningChain, StartupError, Supervisor};
