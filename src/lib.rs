//! Function development kit for the http-stream protocol.
//!
//! A function process listens on a Unix socket. The platform sends one
//! `POST /call` per connection carrying the original gateway request as
//! prefixed headers; the kit decodes it, runs user code once, and writes
//! the result back in the same header dialect.
//!
//! ```no_run
//! use fdk::{Context, Input, Output};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fdk::FdkError> {
//!     fdk::handle(|input: Input, _ctx: Context| async move {
//!         Ok::<_, fdk::BoxError>(Output::from(input.as_text().unwrap_or("hello").to_string()))
//!     })
//!     .await
//! }
//! ```

// Protocol and per-invocation state
pub mod context;
pub mod invoke;
pub mod output;
pub mod protocol;
pub mod shim;

// Transport
pub mod http;
pub mod net;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::{FdkConfig, HandlerOptions};
pub use context::{Context, GatewayView, TracingContext};
pub use error::FdkError;
pub use invoke::{sync_fn, BoxError, Handler, Input, InputMode};
pub use lifecycle::{handle, handle_middleware, handle_with};
pub use output::{Output, RawResult, StreamResult};
pub use shim::{Chain, Next, ShimRequest, ShimResponse};
