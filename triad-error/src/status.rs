//! Error status - whether an error may go away on its own

use std::fmt;

/// How the caller should think about an error.
///
/// triad never retries by itself; the status only tells the user whether
/// running the same command again later could succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    /// Will fail again no matter how often it is tried
    Permanent,
    /// May succeed if tried again later
    Temporary,
}

impl ErrorStatus {
    /// Check if the error is worth trying again
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorStatus::Temporary)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorStatus::Permanent => "permanent",
            ErrorStatus::Temporary => "temporary",
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_temporary_is_retryable() {
        assert!(ErrorStatus::Temporary.is_retryable());
        assert!(!ErrorStatus::Permanent.is_retryable());
        assert_eq!(ErrorStatus::Temporary.to_string(), "temporary");
    }
}
