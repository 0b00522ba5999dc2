//! Error kinds for triad operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on the kind, or on the class helpers
/// [`ErrorKind::is_transport`] and [`ErrorKind::is_storage`], to decide how
/// to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// Invalid configuration (missing API key, unknown provider, ...)
    ConfigInvalid,

    /// Invalid argument passed to function
    InvalidArgument,

    // =========================================================================
    // Transport errors (model API)
    // =========================================================================
    /// Could not reach the model API
    NetworkFailed,

    /// The API key was missing or rejected
    AuthenticationFailed,

    /// Quota or rate limit exceeded
    RateLimited,

    /// The API answered, but not with a usable completion
    InferenceFailed,

    /// Provider is temporarily unavailable (5xx)
    ProviderUnavailable,

    // =========================================================================
    // Storage errors (interaction log)
    // =========================================================================
    /// Storage operation failed
    StorageFailed,

    /// The store is busy or locked by another writer
    StorageLocked,

    // =========================================================================
    // Data errors
    // =========================================================================
    /// Serialization/deserialization failed
    SerializationFailed,

    /// IO operation failed
    IoFailed,

    /// Failed to parse input
    ParseFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::InvalidArgument => "InvalidArgument",

            // Transport
            ErrorKind::NetworkFailed => "NetworkFailed",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::InferenceFailed => "InferenceFailed",
            ErrorKind::ProviderUnavailable => "ProviderUnavailable",

            // Storage
            ErrorKind::StorageFailed => "StorageFailed",
            ErrorKind::StorageLocked => "StorageLocked",

            // Data
            ErrorKind::SerializationFailed => "SerializationFailed",
            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::ParseFailed => "ParseFailed",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::NetworkFailed
                | ErrorKind::RateLimited
                | ErrorKind::ProviderUnavailable
                | ErrorKind::StorageLocked
        )
    }

    /// The model API could not produce an answer
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ErrorKind::NetworkFailed
                | ErrorKind::AuthenticationFailed
                | ErrorKind::RateLimited
                | ErrorKind::InferenceFailed
                | ErrorKind::ProviderUnavailable
        )
    }

    /// The interaction log could not be read or written
    pub fn is_storage(&self) -> bool {
        matches!(self, ErrorKind::StorageFailed | ErrorKind::StorageLocked)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::StorageLocked.to_string(), "StorageLocked");
        assert_eq!(ErrorKind::RateLimited.to_string(), "RateLimited");
    }

    #[test]
    fn test_is_retryable() {
        assert!(ErrorKind::NetworkFailed.is_retryable());
        assert!(ErrorKind::StorageLocked.is_retryable());
        assert!(!ErrorKind::AuthenticationFailed.is_retryable());
        assert!(!ErrorKind::InvalidArgument.is_retryable());
    }

    #[test]
    fn test_classes_are_disjoint() {
        let kinds = [
            ErrorKind::Unexpected,
            ErrorKind::ConfigInvalid,
            ErrorKind::InvalidArgument,
            ErrorKind::NetworkFailed,
            ErrorKind::AuthenticationFailed,
            ErrorKind::RateLimited,
            ErrorKind::InferenceFailed,
            ErrorKind::ProviderUnavailable,
            ErrorKind::StorageFailed,
            ErrorKind::StorageLocked,
            ErrorKind::SerializationFailed,
            ErrorKind::IoFailed,
            ErrorKind::ParseFailed,
        ];
        for kind in kinds {
            assert!(!(kind.is_transport() && kind.is_storage()), "{kind}");
        }
        assert!(ErrorKind::AuthenticationFailed.is_transport());
        assert!(ErrorKind::StorageFailed.is_storage());
        assert!(!ErrorKind::ConfigInvalid.is_transport());
    }
}
