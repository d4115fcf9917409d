//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, one span per invocation)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → The platform's stderr log capture
//!     → Any `metrics` recorder the embedding binary installs
//! ```
//!
//! # Design Decisions
//! - The call id is a span field, so every event of an invocation carries it
//! - Metrics are cheap no-ops without a recorder

pub mod logging;
pub mod metrics;
