//! The HTTP connection seam.
//!
//! The executor hands a fully signed [`http::Request`] to a [`Connector`] and
//! gets the raw response back. [`HttpConnector`] is the production
//! implementation: a reqwest client driven by its own current-thread tokio
//! runtime, so callers stay synchronous. Tests substitute their own connector
//! to observe what would be sent.

use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, Bytes};
use http::{HeaderValue, Request, Response, header};
use reqwest::{Body, Client};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use crate::body::{RequestBody, ResponseBody, UploadBody};

/// Default connect and read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends one request over one connection attempt.
pub trait Connector: Send + Sync {
    /// Send `request` and return the response head with a streaming body.
    ///
    /// Any failure to connect, stream the body or read the response head is
    /// reported as an I/O error; an expired timeout uses
    /// [`io::ErrorKind::TimedOut`].
    fn send(&self, request: Request<RequestBody>) -> io::Result<Response<ResponseBody>>;
}

/// Connect and read timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Time allowed to establish the connection.
    pub connect: Duration,
    /// Time allowed for the whole exchange once connected.
    pub read: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: DEFAULT_TIMEOUT,
            read: DEFAULT_TIMEOUT,
        }
    }
}

/// Blocking connector backed by [`reqwest::Client`].
///
/// Request bodies are streamed as [`UploadBody`] frames, so a chunked upload
/// goes out in chunks of the declared size.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    client: Client,
    runtime: Arc<Runtime>,
}

impl HttpConnector {
    /// Build a connector honouring the system proxy settings.
    pub fn new(timeouts: Timeouts) -> io::Result<Self> {
        Self::build(timeouts, false)
    }

    /// Build a connector that always connects directly.
    pub fn without_proxy(timeouts: Timeouts) -> io::Result<Self> {
        Self::build(timeouts, true)
    }

    fn build(timeouts: Timeouts, no_proxy: bool) -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let guard = runtime.enter();

        let mut builder = Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.read);
        if no_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(into_io_error)?;
        drop(guard);

        Ok(Self {
            client,
            runtime: Arc::new(runtime),
        })
    }
}

impl Connector for HttpConnector {
    fn send(&self, request: Request<RequestBody>) -> io::Result<Response<ResponseBody>> {
        let (mut parts, body) = request.into_parts();

        let body = match body {
            RequestBody::None => None,
            RequestBody::Fixed { length, source } => {
                parts
                    .headers
                    .insert(header::CONTENT_LENGTH, HeaderValue::from(length));
                Some(UploadBody::sized(source, length))
            }
            RequestBody::Chunked { chunk_size, source } => {
                debug!(chunk_size, "sending chunked request body");
                Some(UploadBody::chunked(source, chunk_size))
            }
        };

        let mut builder = self
            .client
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers);
        if let Some(body) = body {
            builder = builder.body(Body::wrap(body));
        }

        let response = self
            .runtime
            .block_on(async { builder.send().await })
            .map_err(into_io_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let extensions = response.extensions().clone();

        let mut out = Response::new(ResponseBody::new(StreamingBody {
            response,
            runtime: Arc::clone(&self.runtime),
            pending: Bytes::new(),
        }));
        *out.status_mut() = status;
        *out.headers_mut() = headers;
        *out.extensions_mut() = extensions;
        Ok(out)
    }
}

/// Pulls response chunks on demand through the connector's runtime.
struct StreamingBody {
    response: reqwest::Response,
    runtime: Arc<Runtime>,
    pending: Bytes,
}

impl Read for StreamingBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pending.is_empty() {
            match self
                .runtime
                .block_on(self.response.chunk())
                .map_err(into_io_error)?
            {
                Some(chunk) => self.pending = chunk,
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }
}

fn into_io_error(err: reqwest::Error) -> io::Error {
    if err.is_timeout() {
        io::Error::new(io::ErrorKind::TimedOut, err)
    } else {
        io::Error::other(err)
    }
}
