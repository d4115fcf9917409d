//! Transport sub-protocol subsystem.
//!
//! # Data Flow
//! ```text
//! Raw transport headers (hyper HeaderMap)
//!     → headers.rs (canonicalize names, drop hop-by-hop headers)
//!     → HeaderMap (canonical name → ordered values)
//!     → names.rs constants pick out the gateway sub-protocol:
//!         Fn-Http-Request-Url, Fn-Http-Method, Fn-Http-H-*,
//!         Fn-Call-Id, Fn-Deadline, X-B3-*
//! ```
//!
//! # Design Decisions
//! - Every lookup and insert canonicalizes, so callers never care about casing
//! - Repeated headers keep arrival order
//! - Hop-by-hop headers never reach user code

pub mod headers;
pub mod names;

pub use headers::{
    canonicalize, decode_gateway_header, decode_transport, encode_gateway_header, HeaderMap,
};
