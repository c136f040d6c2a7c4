//! Error types for executing NetStorage API requests.
//!
//! [`NetStorageError`] separates the four ways a call can fail so callers can
//! react differently: a bad credential is a configuration problem, clock skew
//! is fixed by syncing the local clock, an API error carries the server's
//! verdict verbatim, and a communication error wraps the underlying I/O cause.

use std::io;

use http::{HeaderMap, StatusCode};
use netstorage_auth::AuthError;

/// Errors returned by the transport executor.
#[derive(Debug, thiserror::Error)]
pub enum NetStorageError {
    /// The credential or sign version could not be constructed.
    #[error(transparent)]
    Credential(#[from] AuthError),

    /// The request URL could not be built from the hostname and path.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    /// The server rejected the request and its clock differs from ours by
    /// more than the allowed window.
    #[error(
        "Local server Date is more than 30s out of sync with Remote server \
         (skew {skew_secs}s, status {status})"
    )]
    ClockSkew {
        /// Local time minus server time, in seconds.
        skew_secs: i64,
        /// The non-200 status that triggered the check.
        status: StatusCode,
    },

    /// The server answered with a status other than 200.
    #[error("Unexpected Response from Server: {} {reason}", .status.as_u16())]
    Api {
        /// Response status.
        status: StatusCode,
        /// Response status message.
        reason: String,
        /// Response headers, verbatim.
        headers: HeaderMap,
    },

    /// Signing, connecting, streaming the body or reading the response failed.
    #[error("Communication Error: {source}")]
    Communication {
        /// The underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

impl NetStorageError {
    /// Wrap an I/O failure.
    #[must_use]
    pub fn communication(source: io::Error) -> Self {
        Self::Communication { source }
    }

    /// Whether this is a communication error caused by an expired timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Communication { source } if source.kind() == io::ErrorKind::TimedOut)
    }

    /// The HTTP status of a server-side failure, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::ClockSkew { status, .. } | Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convenience result type for NetStorage calls.
pub type NetStorageResult<T> = Result<T, NetStorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_detect_timeout_communication_error() {
        let err = NetStorageError::communication(io::Error::new(io::ErrorKind::TimedOut, "slow"));
        assert!(err.is_timeout());
        assert_eq!(err.status(), None);

        let err = NetStorageError::communication(io::Error::other("reset"));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_should_format_api_error_with_status_and_reason() {
        let err = NetStorageError::Api {
            status: StatusCode::SERVICE_UNAVAILABLE,
            reason: "Service Unavailable".to_owned(),
            headers: HeaderMap::new(),
        };
        assert_eq!(
            err.to_string(),
            "Unexpected Response from Server: 503 Service Unavailable"
        );
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    }

    #[test]
    fn test_should_convert_auth_error() {
        let err: NetStorageError = AuthError::EmptyCredential { field: "key" }.into();
        assert_eq!(err.to_string(), "key cannot be empty");
    }
}
