//! Signing, sending and validating one NetStorage API call.
//!
//! An [`ApiRequest`] moves through the executor in a fixed order:
//!
//! 1. The path is normalised and the action is signed with a fresh timestamp
//!    and nonce.
//! 2. The body is declared: none for `GET`, zero-length for `PUT`/`POST`
//!    without an upload, fixed-length for an upload of known positive size,
//!    chunked otherwise.
//! 3. The request is sent through the [`Connector`].
//! 4. The response head is validated; on failure the body is drained before
//!    the error is returned.
//!
//! Every call makes exactly one connection attempt.

use std::fmt;
use std::io::{self, Read};

use chrono::Utc;
use http::{HeaderName, HeaderValue, Method, Request, Uri};
use netstorage_auth::{Action, RequestSigner, build_request_path};
use tracing::{debug, warn};

use crate::body::{RequestBody, ResponseBody};
use crate::connector::{Connector, HttpConnector};
use crate::error::{NetStorageError, NetStorageResult};
use crate::validate::validate_response;

/// Data to stream as the request body.
pub struct Upload {
    /// Source of the bytes.
    pub source: Box<dyn Read + Send>,
    /// Length of the source, if known.
    pub size: Option<u64>,
}

impl Upload {
    /// An upload of unknown length.
    #[must_use]
    pub fn new(source: impl Read + Send + 'static) -> Self {
        Self {
            source: Box::new(source),
            size: None,
        }
    }

    /// Declare the length of the source.
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// One API call: verb, storage path, action and optional upload.
#[derive(Debug)]
pub struct ApiRequest {
    /// HTTP verb.
    pub method: Method,
    /// Storage path, normalised before signing.
    pub path: String,
    /// Action to sign.
    pub action: Action,
    /// Request body, if any.
    pub upload: Option<Upload>,
}

impl ApiRequest {
    /// A request without an upload.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>, action: Action) -> Self {
        Self {
            method,
            path: path.into(),
            action,
            upload: None,
        }
    }

    /// Attach an upload.
    #[must_use]
    pub fn with_upload(mut self, upload: Upload) -> Self {
        self.upload = Some(upload);
        self
    }
}

/// Executes signed API requests against one NetStorage host.
#[derive(Debug, Clone)]
pub struct Executor<C = HttpConnector> {
    connector: C,
    signer: RequestSigner,
    use_ssl: bool,
}

impl<C: Connector> Executor<C> {
    /// Create an executor sending plain HTTP.
    pub fn new(connector: C, signer: RequestSigner) -> Self {
        Self {
            connector,
            signer,
            use_ssl: false,
        }
    }

    /// Choose between `https` and `http`.
    #[must_use]
    pub fn with_ssl(mut self, use_ssl: bool) -> Self {
        self.use_ssl = use_ssl;
        self
    }

    /// The signer used for every call.
    pub fn signer(&self) -> &RequestSigner {
        &self.signer
    }

    /// Whether requests use `https`.
    pub fn use_ssl(&self) -> bool {
        self.use_ssl
    }

    /// Sign and send `request`, returning the response body on `200 OK`.
    ///
    /// # Errors
    ///
    /// - [`NetStorageError::ClockSkew`] or [`NetStorageError::Api`] for any
    ///   status other than 200.
    /// - [`NetStorageError::Communication`] when building, sending or reading
    ///   the request fails.
    /// - [`NetStorageError::InvalidUrl`] when the host and path do not form a
    ///   valid URL.
    pub fn execute(&self, request: ApiRequest) -> NetStorageResult<ResponseBody> {
        let ApiRequest {
            method,
            path,
            action,
            upload,
        } = request;

        let path = build_request_path(&path);
        let scheme = if self.use_ssl { "https" } else { "http" };
        let url = format!("{scheme}://{}{path}", self.signer.credential().hostname());
        let uri: Uri = url
            .parse()
            .map_err(|e| NetStorageError::InvalidUrl(format!("{url}: {e}")))?;

        let signed = self.signer.compute_headers(&action, &path);

        let body = if method == Method::GET {
            if let Some(upload) = &upload {
                warn!(size = ?upload.size, %uri, "ignoring upload attached to a GET request");
            }
            RequestBody::None
        } else {
            match upload {
                Some(upload) => RequestBody::upload(upload.source, upload.size),
                None => RequestBody::empty(),
            }
        };

        debug!(
            %method,
            %uri,
            content_length = ?body.content_length(),
            chunk_size = ?body.chunk_size(),
            "sending request"
        );

        let mut http_request = Request::new(body);
        *http_request.method_mut() = method;
        *http_request.uri_mut() = uri;
        let headers = http_request.headers_mut();
        for (name, value) in signed.pairs() {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(invalid_header)?;
            let value = HeaderValue::from_str(value).map_err(invalid_header)?;
            headers.insert(name, value);
        }

        let response = self
            .connector
            .send(http_request)
            .map_err(NetStorageError::communication)?;
        let (parts, body) = response.into_parts();
        debug!(status = %parts.status, "received response");

        if let Err(err) = validate_response(&parts, Utc::now()) {
            // Drain failures are ignored.
            let _ = body.drain();
            return Err(err);
        }

        Ok(body)
    }
}

fn invalid_header(err: impl std::error::Error + Send + Sync + 'static) -> NetStorageError {
    NetStorageError::communication(io::Error::new(io::ErrorKind::InvalidInput, err))
}
