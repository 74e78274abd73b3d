//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!     → tracing.rs (per-connection spans carrying connection_id / peer_addr)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - Metrics are recorded unconditionally; without an exporter they are no-ops

pub mod logging;
pub mod metrics;
pub mod tracing;
