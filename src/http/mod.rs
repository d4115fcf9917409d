//! Transport handling subsystem.
//!
//! # Data Flow
//! ```text
//! Unix socket connection (one per invocation)
//!     → server.rs (hyper http1, keep-alive off)
//!     → Dispatcher: POST /call check → header decode → body accumulation
//!     → Context → handler or middleware shim
//!     → output::encode / output::error_response
//!     → Send to the platform
//! ```

pub mod server;

pub use server::{serve, Dispatcher, Function, CALL_PATH};
