//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Connection ids flow through every per-connection log line
//! - Upstream error causes are logged, never echoed to clients
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
