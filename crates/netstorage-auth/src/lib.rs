//! Action serialization and CMS v3.5 request signing for the NetStorage HTTP API.
//!
//! Every NetStorage API call is described by an [`Action`]: an action name
//! plus a handful of typed parameters. This crate turns an action into the
//! canonical `X-Akamai-ACS-Action` string and signs it, together with a
//! timestamp, a nonce and the account name, using a keyed hash selected by
//! the [`SignVersion`].
//!
//! # Usage
//!
//! ```rust
//! use netstorage_auth::{Action, Credential, RequestSigner, SignVersion};
//!
//! let credential = Credential::new("example-nsu.akamaihd.net", "user1", "secret1").unwrap();
//! let signer = RequestSigner::new(credential).with_version(SignVersion::HmacSha256);
//!
//! let headers = signer.compute_headers(&Action::download(), "/123456/file.txt");
//! assert_eq!(headers.action, "action=download&version=1");
//! ```
//!
//! # Modules
//!
//! - [`action`] - The action model and its declared parameter table
//! - [`canonical`] - Canonical action string and request path encoding
//! - [`credentials`] - Upload account credentials
//! - [`error`] - Construction error types
//! - [`format`] - Per-parameter value formatters
//! - [`signer`] - Auth header computation

pub mod action;
pub mod canonical;
pub mod credentials;
pub mod error;
pub mod format;
pub mod signer;

pub use action::{Action, Checksum};
pub use canonical::{build_request_path, serialize_action};
pub use credentials::Credential;
pub use error::AuthError;
pub use signer::{RequestSigner, SignVersion, SignedHeaders};
