//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! FN_LISTENER (unix:<path>)
//!     → listener.rs (bind phony socket, chmod, symlink publish)
//!     → accept loop in http::server
//!     → connection.rs (id for logs, in-flight tracking)
//!     → Hand off to the dispatcher
//! ```
//!
//! # Design Decisions
//! - The socket becomes visible only after it is ready to accept
//! - One connection carries one invocation
//! - Socket files are removed when the listener drops

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{parse_address, FnListener, ListenerError};
