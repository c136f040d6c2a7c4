//! Error types for credential and signer construction.
//!
//! Signing itself is infallible once a [`Credential`](crate::Credential) and a
//! [`SignVersion`](crate::SignVersion) exist, so every variant here is a
//! construction error surfaced before any request is built.

/// Errors raised while building credentials or selecting a sign version.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// One of the credential fields was empty.
    #[error("{field} cannot be empty")]
    EmptyCredential {
        /// Name of the offending field (`hostname`, `username` or `key`).
        field: &'static str,
    },

    /// The sign version tag does not name a supported keyed-hash algorithm.
    #[error("unsupported sign version: {0}")]
    UnsupportedSignVersion(String),
}
