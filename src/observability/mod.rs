//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! cache / proxy / stream / resilience
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer, filter via RUST_LOG or config)
//!     → Prometheus scrape endpoint
//! ```

pub mod logging;
pub mod metrics;
