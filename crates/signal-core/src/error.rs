//! Error types for the signaling relay

use thiserror::Error;

/// Errors raised while routing a single signaling message.
///
/// None of these are fatal: the offending message is dropped and the
/// sender's connection stays open.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("candidate payload has no address field")]
    MissingCandidateAddress,

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

impl RelayError {
    /// Short label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::MalformedMessage(_) => "malformed",
            RelayError::MissingCandidateAddress => "missing_address",
            RelayError::MessageTooLarge { .. } => "too_large",
        }
    }
}

/// Errors from resolving a request path inside the public directory
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path traversal attempt blocked: {0}")]
    Traversal(String),

    #[error("cannot resolve path: {0}")]
    Resolve(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RelayError::MessageTooLarge {
            size: 70_000,
            max: 65_536,
        };
        assert_eq!(err.to_string(), "message too large: 70000 bytes (max 65536)");

        let err = RelayError::MalformedMessage("expected object".into());
        assert!(err.to_string().contains("expected object"));
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(RelayError::MissingCandidateAddress.kind(), "missing_address");
        assert_eq!(RelayError::MalformedMessage(String::new()).kind(), "malformed");
    }
}
