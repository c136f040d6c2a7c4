//! Streaming checksums for upload verification.
//!
//! NetStorage accepts MD5, SHA-1 and SHA-256 digests alongside an upload and
//! rejects the file when the received bytes do not match. These helpers
//! compute a digest by reading a source to the end through a fixed buffer.

use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

use digest::Digest;

/// Size of the read buffer used while hashing.
pub const HASH_BUFFER_SIZE: usize = 1024 * 1024;

/// Digest algorithms accepted by the upload action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// MD5.
    Md5,
    /// SHA-1.
    Sha1,
    /// SHA-256.
    Sha256,
}

impl HashAlgorithm {
    /// The wire parameter name for this digest.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`HashAlgorithm`] from a string fails.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown hash algorithm: {0}")]
pub struct ParseHashAlgorithmError(String);

impl FromStr for HashAlgorithm {
    type Err = ParseHashAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            _ => Err(ParseHashAlgorithmError(s.to_owned())),
        }
    }
}

/// Read `reader` to the end and return its raw digest.
///
/// # Examples
///
/// ```
/// use netstorage_core::checksums::{HashAlgorithm, compute_hash};
///
/// let digest = compute_hash(&b"hello"[..], HashAlgorithm::Md5).unwrap();
/// assert_eq!(hex::encode(digest), "5d41402abc4b2a76b9719d911017c592");
/// ```
pub fn compute_hash(reader: impl Read, algorithm: HashAlgorithm) -> io::Result<Vec<u8>> {
    match algorithm {
        HashAlgorithm::Md5 => digest_reader::<md5::Md5>(reader),
        HashAlgorithm::Sha1 => digest_reader::<sha1::Sha1>(reader),
        HashAlgorithm::Sha256 => digest_reader::<sha2::Sha256>(reader),
    }
}

fn digest_reader<D: Digest>(mut reader: impl Read) -> io::Result<Vec<u8>> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; HASH_BUFFER_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => Digest::update(&mut hasher, &buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(hasher.finalize().to_vec())
}
