//! # triad-error
//!
//! Unified error handling for triad.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what went wrong (e.g., NetworkFailed, StorageLocked)
//! - **ErrorStatus**: Know whether trying again later could help
//! - **Error Context**: Operation name plus key-value pairs for locating the cause
//! - **Error Source**: Underlying errors are wrapped, not leaked
//!
//! Errors fall into two classes that the surface reports to the user:
//! transport errors (the model API could not answer) and storage errors
//! (the interaction log could not be read or written).
//!
//! ## Usage
//!
//! ```rust
//! use triad_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::StorageLocked, "database is locked")
//!         .with_operation("memory::append")
//!         .with_context("agent", "PlannerAgent"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All functions return `Result<T, triad_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Don't abuse `From<OtherError>` to prevent raw error leakage

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using triad Error
pub type Result<T> = std::result::Result<T, Error>;
