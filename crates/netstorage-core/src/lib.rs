//! High-level client for the NetStorage HTTP API.
//!
//! [`NetStorage`] exposes one method per storage operation (upload, download,
//! delete, rename, stat, symlink, directory listing, quota query) on top of
//! the signed transport in `netstorage-http`.
//!
//! # Modules
//!
//! - [`checksums`] - Streaming MD5 / SHA-1 / SHA-256 digests
//! - [`client`] - The operations facade
//! - [`config`] - Environment-driven configuration

pub mod checksums;
pub mod client;
pub mod config;

pub use checksums::{HashAlgorithm, compute_hash};
pub use client::{NetStorage, UploadOptions};
pub use config::NetStorageConfig;
