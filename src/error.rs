// Error handling module
// Defines the token lifecycle error taxonomy

use std::fmt;

use thiserror::Error;

/// Category of a transport-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The request did not complete within the configured timeout
    Timeout,
    /// The connection could not be established
    Connection,
    /// Any other transport fault (TLS, body read, request build, ...)
    Other,
}

impl TransportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connection => "connection",
            TransportErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the token manager.
///
/// Issuance failures are returned as values; none of these abort the process.
#[derive(Error, Debug)]
pub enum TokenError {
    /// Token endpoint answered with a non-200 status
    #[error("Token request failed: {status} - {body} ({url})")]
    HttpStatus {
        status: u16,
        body: String,
        url: String,
    },

    /// Request never produced a response
    #[error("Transport error ({kind}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    /// 200 response whose body could not be used as a token
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// Authorization header requested before any token was issued
    #[error("No access token has been issued")]
    NoToken,
}

impl TokenError {
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        TokenError::Transport {
            kind,
            message: message.into(),
        }
    }

    /// Transport category, if this is a transport failure
    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            TokenError::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// HTTP status, if the endpoint answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            TokenError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for token operations
pub type Result<T> = std::result::Result<T, TokenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TokenError::HttpStatus {
            status: 401,
            body: r#"{"error":"invalid_client"}"#.to_string(),
            url: "https://mockapi.kiwoom.com/oauth2/token".to_string(),
        };
        assert_eq!(
            err.to_string(),
            r#"Token request failed: 401 - {"error":"invalid_client"} (https://mockapi.kiwoom.com/oauth2/token)"#
        );

        let err = TokenError::transport(TransportErrorKind::Timeout, "deadline elapsed");
        assert_eq!(err.to_string(), "Transport error (timeout): deadline elapsed");

        let err = TokenError::NoToken;
        assert_eq!(err.to_string(), "No access token has been issued");
    }

    #[test]
    fn test_invalid_response_message() {
        let err = TokenError::InvalidResponse("missing field `token`".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid token response: missing field `token`"
        );
    }

    #[test]
    fn test_transport_kind_accessor() {
        let err = TokenError::transport(TransportErrorKind::Connection, "refused");
        assert_eq!(err.transport_kind(), Some(TransportErrorKind::Connection));
        assert_eq!(err.status(), None);

        let err = TokenError::HttpStatus {
            status: 500,
            body: String::new(),
            url: String::new(),
        };
        assert_eq!(err.transport_kind(), None);
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_transport_kind_labels() {
        assert_eq!(TransportErrorKind::Timeout.to_string(), "timeout");
        assert_eq!(TransportErrorKind::Connection.to_string(), "connection");
        assert_eq!(TransportErrorKind::Other.to_string(), "other");
    }
}
