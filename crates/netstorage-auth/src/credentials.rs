//! NetStorage upload account credentials.
//!
//! A [`Credential`] bundles the storage hostname, the upload account name
//! (sent in clear inside the auth-data header) and the secret key used to salt
//! the keyed hash. It is validated once at construction and then only read.

use std::fmt;

use crate::error::AuthError;

/// Hostname, username and secret key for one NetStorage upload account.
///
/// # Examples
///
/// ```
/// use netstorage_auth::Credential;
///
/// let credential = Credential::new("example-nsu.akamaihd.net", "user1", "secret1").unwrap();
/// assert_eq!(credential.username(), "user1");
///
/// assert!(Credential::new("example-nsu.akamaihd.net", "", "secret1").is_err());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    hostname: String,
    username: String,
    key: String,
}

impl Credential {
    /// Create a credential, rejecting empty fields.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmptyCredential`] naming the first empty field.
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        key: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let hostname = hostname.into();
        let username = username.into();
        let key = key.into();

        if hostname.is_empty() {
            return Err(AuthError::EmptyCredential { field: "hostname" });
        }
        if username.is_empty() {
            return Err(AuthError::EmptyCredential { field: "username" });
        }
        if key.is_empty() {
            return Err(AuthError::EmptyCredential { field: "key" });
        }

        Ok(Self {
            hostname,
            username,
            key,
        })
    }

    /// The storage hostname, without scheme or port.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The upload account name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The secret key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("key", &"<redacted>")
            .finish()
    }
}
