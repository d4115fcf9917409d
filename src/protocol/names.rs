//! Header names and fixed values of the http-stream sub-protocol.
//!
//! All names are stored in canonical form (see [`super::canonicalize`]).

/// Prefix wrapping every header of the original gateway request/response.
pub const GATEWAY_PREFIX: &str = "Fn-Http-H-";

/// Full URL of the original gateway request.
pub const REQUEST_URL: &str = "Fn-Http-Request-Url";

/// Method of the original gateway request.
pub const METHOD: &str = "Fn-Http-Method";

/// Status code the gateway should answer with (numeric text).
pub const STATUS: &str = "Fn-Http-Status";

pub const CALL_ID: &str = "Fn-Call-Id";

/// Invocation deadline, RFC 3339.
pub const DEADLINE: &str = "Fn-Deadline";

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";

/// Identification headers stamped on every response.
pub const FDK_VERSION: &str = "Fn-Fdk-Version";
pub const FDK_RUNTIME: &str = "Fn-Fdk-Runtime";

pub const FDK_VERSION_VALUE: &str = concat!("fdk-rust/", env!("CARGO_PKG_VERSION"));
pub const FDK_RUNTIME_VALUE: &str = "rust/2021";

/// Zipkin B3 propagation headers.
pub const TRACE_ID: &str = "X-B3-Traceid";
pub const SPAN_ID: &str = "X-B3-Spanid";
pub const PARENT_SPAN_ID: &str = "X-B3-Parentspanid";
pub const SAMPLED: &str = "X-B3-Sampled";
pub const FLAGS: &str = "X-B3-Flags";

/// Hop-by-hop headers dropped while decoding the transport request.
pub const HOP_BY_HOP: [&str; 6] = [
    "Te",
    "Connection",
    "Keep-Alive",
    "Transfer-Encoding",
    "Trailer",
    "Upgrade",
];

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// Returns `true` for the headers the kit stamps itself.
pub fn is_identification_header(canonical: &str) -> bool {
    canonical == FDK_VERSION || canonical == FDK_RUNTIME
}
