//! User-code side of an invocation.
//!
//! # Data Flow
//! ```text
//! body chunks → input.rs (Accumulator per InputMode) → Input
//! Input + Context → handler.rs (Handler::call) → Output or error
//! ```

pub mod handler;
pub mod input;

pub use handler::{sync_fn, BoxError, Handler, HandlerFuture, SyncFn};
pub use input::{Accumulator, Input, InputMode};
