//! Response encoding subsystem.
//!
//! # Data Flow
//! ```text
//! Output (from user code or the middleware shim)
//!     → encoder.rs (content-type negotiation, head, body by variant)
//!     → writer.rs (channel-backed body, ended exactly once)
//!     → hyper Response<TransportBody>
//!
//! failures → envelope.rs ({"message", "detail"} JSON, same stamping)
//! ```
//!
//! # Design Decisions
//! - Output is a closed enum; each variant has one encoding path
//! - Non-empty results without a content type are JSON
//! - The body writer is consumed by `end`, so termination happens once

pub mod encoder;
pub mod envelope;
pub mod result;
pub mod writer;

pub use encoder::{encode, is_json_content_type, negotiate, Negotiated};
pub use envelope::{describe, error_response, ErrorEnvelope};
pub use result::{Output, RawResult, StreamResult};
pub use writer::{ResponseWriter, TransportBody};
