//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment (FN_*, OCI_*, FDK_LOG, user keys)
//!     → loader.rs (read & convert)
//!     → validation.rs (semantic checks)
//!     → FdkConfig (validated, immutable)
//!     → shared via Arc with every invocation Context
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults; only serving needs FN_LISTENER
//! - Core logic never reads the environment itself

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_from_env, load_from_vars, ConfigError};
pub use schema::{FdkConfig, HandlerOptions, LoggingConfig, TracingConfig};
