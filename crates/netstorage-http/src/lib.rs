//! Blocking transport for signed NetStorage API requests.
//!
//! The [`Executor`] signs an [`ApiRequest`] with a [`netstorage_auth::RequestSigner`],
//! streams the optional upload as a fixed-length or chunked body, and
//! validates the response. Failures are reported as a [`NetStorageError`].
//!
//! # Modules
//!
//! - [`body`] - Request body declaration and the owned response body
//! - [`connector`] - The connection seam and its reqwest implementation
//! - [`error`] - Error taxonomy
//! - [`executor`] - Request execution
//! - [`validate`] - Status and clock-skew checks

pub mod body;
pub mod connector;
pub mod error;
pub mod executor;
pub mod validate;

pub use body::{RequestBody, ResponseBody, UploadBody, UploadSource};
pub use connector::{Connector, HttpConnector, Timeouts};
pub use error::{NetStorageError, NetStorageResult};
pub use executor::{ApiRequest, Executor, Upload};
