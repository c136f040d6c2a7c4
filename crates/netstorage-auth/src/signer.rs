//! CMS v3.5 request signing.
//!
//! Each request carries three authentication headers:
//!
//! ```text
//! X-Akamai-ACS-Action:    <canonical action string>
//! X-Akamai-ACS-Auth-Data: <version>, 0.0.0.0, 0.0.0.0, <unix time>, <nonce>, <username>
//! X-Akamai-ACS-Auth-Sign: Base64(HMAC(key, AuthData + Path + "\n" + "x-akamai-acs-action:" + Action + "\n"))
//! ```
//!
//! The two `0.0.0.0` fields are placeholders; the server derives the client
//! address from the connection. The keyed-hash algorithm is selected by the
//! sign version tag in the auth data.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use hmac::{Hmac, KeyInit, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::Sha256;
use tracing::debug;

use crate::action::Action;
use crate::canonical::serialize_action;
use crate::credentials::Credential;
use crate::error::AuthError;

type HmacMd5 = Hmac<Md5>;
type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Client identification header, for server-side diagnostics only.
pub const KIT_VERSION_HEADER: &str = "X-Akamai-NSKit";
/// Value sent in [`KIT_VERSION_HEADER`].
pub const KIT_VERSION: &str = concat!("Rust/", env!("CARGO_PKG_VERSION"));
/// Header carrying the canonical action string.
pub const ACTION_HEADER: &str = "X-Akamai-ACS-Action";
/// Header carrying the signed metadata.
pub const AUTH_DATA_HEADER: &str = "X-Akamai-ACS-Auth-Data";
/// Header carrying the base64 signature.
pub const AUTH_SIGN_HEADER: &str = "X-Akamai-ACS-Auth-Sign";

/// Keyed-hash algorithm used to sign a request, tagged by its protocol number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignVersion {
    /// HMAC-MD5 (`3`).
    HmacMd5,
    /// HMAC-SHA1 (`4`).
    HmacSha1,
    /// HMAC-SHA256 (`5`).
    #[default]
    HmacSha256,
}

impl SignVersion {
    /// The numeric tag sent in the auth-data header.
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::HmacMd5 => 3,
            Self::HmacSha1 => 4,
            Self::HmacSha256 => 5,
        }
    }

    /// Compute the keyed hash of `data` with this version's algorithm.
    #[must_use]
    pub fn keyed_hash(self, key: &[u8], data: &[u8]) -> Vec<u8> {
        match self {
            Self::HmacMd5 => hmac::<HmacMd5>(key, data),
            Self::HmacSha1 => hmac::<HmacSha1>(key, data),
            Self::HmacSha256 => hmac::<HmacSha256>(key, data),
        }
    }
}

fn hmac<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = M::new_from_slice(key).expect("HMAC can accept any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

impl fmt::Display for SignVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl TryFrom<u8> for SignVersion {
    type Error = AuthError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            3 => Ok(Self::HmacMd5),
            4 => Ok(Self::HmacSha1),
            5 => Ok(Self::HmacSha256),
            other => Err(AuthError::UnsupportedSignVersion(other.to_string())),
        }
    }
}

impl FromStr for SignVersion {
    type Err = AuthError;

    /// Accepts the numeric tag or the algorithm name (`hmac-sha256`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(tag) = s.trim().parse::<u8>() {
            return Self::try_from(tag);
        }
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "hmacmd5" => Ok(Self::HmacMd5),
            "hmacsha1" => Ok(Self::HmacSha1),
            "hmacsha256" => Ok(Self::HmacSha256),
            _ => Err(AuthError::UnsupportedSignVersion(s.to_owned())),
        }
    }
}

/// The authentication headers computed for one request attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// Value of [`ACTION_HEADER`].
    pub action: String,
    /// Value of [`AUTH_DATA_HEADER`].
    pub auth_data: String,
    /// Value of [`AUTH_SIGN_HEADER`].
    pub auth_sign: String,
}

impl SignedHeaders {
    /// All four request headers, kit identifier first.
    #[must_use]
    pub fn pairs(&self) -> [(&'static str, &str); 4] {
        [
            (KIT_VERSION_HEADER, KIT_VERSION),
            (ACTION_HEADER, &self.action),
            (AUTH_DATA_HEADER, &self.auth_data),
            (AUTH_SIGN_HEADER, &self.auth_sign),
        ]
    }
}

/// Build the auth-data header value.
///
/// # Examples
///
/// ```
/// use netstorage_auth::signer::{SignVersion, build_auth_data};
///
/// assert_eq!(
///     build_auth_data(SignVersion::HmacSha256, 1_384_128_000, 1234, "user1"),
///     "5, 0.0.0.0, 0.0.0.0, 1384128000, 1234, user1"
/// );
/// ```
#[must_use]
pub fn build_auth_data(version: SignVersion, timestamp: i64, nonce: u32, username: &str) -> String {
    format!("{version}, 0.0.0.0, 0.0.0.0, {timestamp}, {nonce}, {username}")
}

/// Build the string the signature is computed over.
#[must_use]
pub fn build_sign_data(auth_data: &str, path: &str, action: &str) -> String {
    format!(
        "{auth_data}{path}\n{}:{action}\n",
        ACTION_HEADER.to_ascii_lowercase()
    )
}

/// Compute the auth-sign header value: `Base64(HMAC(key, sign_data))`.
#[must_use]
pub fn compute_signature(
    version: SignVersion,
    key: &str,
    auth_data: &str,
    path: &str,
    action: &str,
) -> String {
    let sign_data = build_sign_data(auth_data, path, action);
    BASE64.encode(version.keyed_hash(key.as_bytes(), sign_data.as_bytes()))
}

/// Signs actions for one credential with one keyed-hash algorithm.
///
/// Holds no mutable state; the timestamp and nonce are drawn per call, so a
/// signer can be shared across threads.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    credential: Credential,
    version: SignVersion,
}

impl RequestSigner {
    /// Create a signer using HMAC-SHA256.
    #[must_use]
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            version: SignVersion::default(),
        }
    }

    /// Use a different keyed-hash algorithm.
    #[must_use]
    pub fn with_version(mut self, version: SignVersion) -> Self {
        self.version = version;
        self
    }

    /// The credential used for signing.
    #[must_use]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// The keyed-hash algorithm in use.
    #[must_use]
    pub fn version(&self) -> SignVersion {
        self.version
    }

    /// Compute fresh headers for `action` sent to `path`.
    ///
    /// `path` must be the request path exactly as sent on the wire.
    #[must_use]
    pub fn compute_headers(&self, action: &Action, path: &str) -> SignedHeaders {
        let nonce = rand::random::<u32>() & 0x7fff_ffff;
        self.compute_headers_at(action, path, Utc::now().timestamp(), nonce)
    }

    /// Compute headers with an explicit timestamp and nonce.
    #[must_use]
    pub fn compute_headers_at(
        &self,
        action: &Action,
        path: &str,
        timestamp: i64,
        nonce: u32,
    ) -> SignedHeaders {
        let action = serialize_action(action);
        let auth_data = build_auth_data(self.version, timestamp, nonce, self.credential.username());
        let auth_sign = compute_signature(
            self.version,
            self.credential.key(),
            &auth_data,
            path,
            &action,
        );

        debug!(
            action = %action,
            auth_data = %auth_data,
            path,
            "computed request signature"
        );

        SignedHeaders {
            action,
            auth_data,
            auth_sign,
        }
    }
}
