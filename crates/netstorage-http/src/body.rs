//! Request and response body types for the transport executor.
//!
//! The executor decides how an upload is declared on the wire:
//!
//! - **None**: no body at all (GET).
//! - **Fixed**: `Content-Length` of a known size; zero for PUT/POST without an
//!   upload.
//! - **Chunked**: `Transfer-Encoding: chunked` when the size is unknown.
//!
//! Uploads are pulled through a 1 MiB buffer and handed to the transport as
//! an [`UploadBody`], which emits one frame per chunk. Response bodies are
//! handed to the caller as an owned [`ResponseBody`] that closes the
//! connection when dropped.

use std::fmt;
use std::io::{self, BufReader, Read};
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use http_body::{Frame, SizeHint};
use tracing::debug;

/// Size of the read buffer used while streaming an upload.
pub const UPLOAD_BUFFER_SIZE: usize = 1024 * 1024;

/// Chunk size declared for uploads of unknown length.
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// An upload source read through a fixed-size buffer.
pub struct UploadSource {
    inner: BufReader<Box<dyn Read + Send>>,
    sent: u64,
}

impl UploadSource {
    /// Buffer `source` with [`UPLOAD_BUFFER_SIZE`].
    #[must_use]
    pub fn new(source: Box<dyn Read + Send>) -> Self {
        Self {
            inner: BufReader::with_capacity(UPLOAD_BUFFER_SIZE, source),
            sent: 0,
        }
    }

    /// Number of bytes handed to the transport so far.
    #[must_use]
    pub fn bytes_sent(&self) -> u64 {
        self.sent
    }
}

impl Read for UploadSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.sent += n as u64;
        Ok(n)
    }
}

impl fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSource")
            .field("sent", &self.sent)
            .finish_non_exhaustive()
    }
}

/// How the request body is declared and where its bytes come from.
#[derive(Debug)]
pub enum RequestBody {
    /// No body.
    None,
    /// A body of exactly `length` bytes.
    Fixed {
        /// Declared `Content-Length`.
        length: u64,
        /// Source of the bytes.
        source: UploadSource,
    },
    /// A chunked body of unknown length.
    Chunked {
        /// Declared chunk size.
        chunk_size: usize,
        /// Source of the bytes.
        source: UploadSource,
    },
}

impl RequestBody {
    /// A fixed zero-length body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Fixed {
            length: 0,
            source: UploadSource::new(Box::new(io::empty())),
        }
    }

    /// Declare `source` as fixed-length when `size` is known and positive,
    /// chunked otherwise.
    #[must_use]
    pub fn upload(source: Box<dyn Read + Send>, size: Option<u64>) -> Self {
        let source = UploadSource::new(source);
        match size {
            Some(length) if length > 0 => Self::Fixed { length, source },
            _ => Self::Chunked {
                chunk_size: CHUNK_SIZE,
                source,
            },
        }
    }

    /// The declared `Content-Length`, if fixed.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        match self {
            Self::Fixed { length, .. } => Some(*length),
            _ => None,
        }
    }

    /// The declared chunk size, if chunked.
    #[must_use]
    pub fn chunk_size(&self) -> Option<usize> {
        match self {
            Self::Chunked { chunk_size, .. } => Some(*chunk_size),
            _ => None,
        }
    }
}

/// An [`UploadSource`] streamed as HTTP body frames.
///
/// Every frame except the last holds exactly `frame_size` bytes, so a chunked
/// body goes out in chunks of that size. A sized body stops after `length`
/// bytes.
pub struct UploadBody {
    source: Mutex<UploadSource>,
    frame_size: usize,
    remaining: Option<u64>,
    length: Option<u64>,
    done: bool,
}

impl UploadBody {
    /// A body of exactly `length` bytes read in frames of [`UPLOAD_BUFFER_SIZE`].
    #[must_use]
    pub fn sized(source: UploadSource, length: u64) -> Self {
        Self {
            source: Mutex::new(source),
            frame_size: UPLOAD_BUFFER_SIZE,
            remaining: Some(length),
            length: Some(length),
            done: length == 0,
        }
    }

    /// A body of unknown length sent in frames of `chunk_size`.
    #[must_use]
    pub fn chunked(source: UploadSource, chunk_size: usize) -> Self {
        Self {
            source: Mutex::new(source),
            frame_size: chunk_size.max(1),
            remaining: None,
            length: None,
            done: false,
        }
    }

    fn next_frame(&mut self) -> io::Result<Option<Bytes>> {
        if self.done {
            return Ok(None);
        }
        let want = match self.remaining {
            Some(remaining) => usize::try_from(remaining)
                .unwrap_or(usize::MAX)
                .min(self.frame_size),
            None => self.frame_size,
        };
        let source = self
            .source
            .get_mut()
            .map_err(|_| io::Error::other("upload source lock poisoned"))?;

        let mut buf = BytesMut::zeroed(want);
        let n = read_full(source, &mut buf)?;
        if n < want || self.remaining == Some(n as u64) {
            self.done = true;
            debug!(bytes = source.bytes_sent(), "upload source exhausted");
        }
        if let Some(remaining) = &mut self.remaining {
            *remaining -= n as u64;
        }
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf.freeze()))
    }
}

/// Fill `buf` from `reader`, stopping early only at end of input.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl http_body::Body for UploadBody {
    type Data = Bytes;
    type Error = io::Error;

    // Source reads block the thread polling this body.
    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(self.get_mut().next_frame().transpose().map(|r| r.map(Frame::data)))
    }

    fn is_end_stream(&self) -> bool {
        self.done
    }

    fn size_hint(&self) -> SizeHint {
        match self.length {
            Some(length) => SizeHint::with_exact(length),
            None => SizeHint::default(),
        }
    }
}

impl fmt::Debug for UploadBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadBody")
            .field("frame_size", &self.frame_size)
            .field("length", &self.length)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

/// A response body owned by the caller.
///
/// The underlying connection stays open until this value is dropped.
pub struct ResponseBody {
    inner: Box<dyn Read + Send>,
}

impl ResponseBody {
    /// Wrap a readable response stream.
    #[must_use]
    pub fn new(inner: impl Read + Send + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    /// A body with no content.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(io::empty())
    }

    /// Read the body to the end, discarding it, and close it.
    pub fn drain(mut self) -> io::Result<u64> {
        io::copy(&mut self.inner, &mut io::sink())
    }

    /// Read the whole body into memory.
    pub fn into_bytes(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.inner.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Read for ResponseBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody").finish_non_exhaustive()
    }
}
