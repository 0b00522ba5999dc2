//! Triad error types
//!
//! Re-exports triad-error and provides core-specific conveniences.

pub use triad_error::{Error, ErrorKind, ErrorStatus, Result};

/// Create a ConfigInvalid error for an unset API key variable
pub fn missing_api_key(var: &'static str) -> Error {
    Error::config_invalid(format!("{} environment variable not set", var))
        .with_context("env", var)
}

/// Create an InvalidArgument error for a blank text argument
pub fn blank_argument(name: &'static str) -> Error {
    Error::invalid_argument(format!("'{}' must not be empty", name))
        .with_context("argument", name)
}

/// Create an InvalidArgument error for an unrecognized agent name
pub fn unknown_agent(name: impl Into<String>) -> Error {
    let name = name.into();
    Error::invalid_argument(format!("unknown agent '{}'", name)).with_context("agent", name)
}

/// Create a ConfigInvalid error for an unrecognized provider name
pub fn unknown_provider(name: impl Into<String>) -> Error {
    let name = name.into();
    Error::config_invalid(format!("unknown provider '{}'", name)).with_context("provider", name)
}
