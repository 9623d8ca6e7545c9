//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! multiplexer / dispatcher
//!     → logging.rs (structured tracing events on stderr)
//!     → metrics.rs (counters and gauges, optional Prometheus listener)
//! ```
//!
//! # Design Decisions
//! - Every correlated exchange is logged as `METHOD PATH: STATUS REASON`
//!   whether or not a transform is configured
//! - Metric updates are plain facade calls; without an installed exporter they are no-ops

pub mod logging;
pub mod metrics;
