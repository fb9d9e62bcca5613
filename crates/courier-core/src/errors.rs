//! Error types and wire error codes.

// ── Error code constants ────────────────────────────────────────────

/// Malformed send request (e.g. specific target with no user).
pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
/// Unexpected internal error.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Errors surfaced by the dispatcher.
///
/// Delivery failures are deliberately absent: a push to a dead or backed-up
/// connection is recovered locally (logged and counted) and the stored
/// notification stands, so the caller never sees it.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The send request is malformed. Rejected before any state mutation.
    #[error("{message}")]
    InvalidRequest {
        /// Description of what is wrong.
        message: String,
    },
}

impl DispatchError {
    /// Build an `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Machine-readable error code for this variant.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => INVALID_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_request_code() {
        let err = DispatchError::invalid_request("missing userId");
        assert_eq!(err.code(), INVALID_REQUEST);
    }

    #[test]
    fn display_is_message() {
        let err = DispatchError::invalid_request("missing userId");
        assert_eq!(err.to_string(), "missing userId");
    }

    #[test]
    fn codes_are_screaming_snake_case() {
        for code in [INVALID_REQUEST, INTERNAL_ERROR] {
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }
}
