//! Invocation context subsystem.
//!
//! # Data Flow
//! ```text
//! decoded transport headers + accumulated body + Arc<FdkConfig>
//!     → RequestEnvelope (immutable)
//!     → Context (shared handle, owns the ResponseIntent)
//!         → gateway.rs: GatewayView (prefix-stripped gateway request,
//!           prefixed gateway response headers, gateway status)
//!         → trace_context.rs: TracingContext (B3 headers + config)
//! ```
//!
//! # Design Decisions
//! - The request side is never mutated after construction
//! - Response content type has a single slot, never a header entry
//! - Writes after the response is committed are dropped

pub mod gateway;
pub mod invocation;
pub mod trace_context;

pub use gateway::GatewayView;
pub use invocation::{Context, RequestEnvelope, ResponseIntent};
pub use trace_context::TracingContext;
