//! Client configuration.
//!
//! Provides [`NetStorageConfig`] for connecting to one NetStorage upload
//! account. Values are loaded from `NETSTORAGE_*` environment variables.

use std::time::Duration;

use netstorage_http::Timeouts;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Connection settings for one upload account.
///
/// # Examples
///
/// ```
/// use netstorage_core::config::NetStorageConfig;
///
/// let config = NetStorageConfig::builder()
///     .host("example-nsu.akamaihd.net".into())
///     .username("user1".into())
///     .key("secret1".into())
///     .build();
/// assert_eq!(config.sign_version, 5);
/// assert!(!config.use_ssl);
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct NetStorageConfig {
    /// NetStorage hostname (e.g. `"example-nsu.akamaihd.net"`).
    #[builder(default)]
    pub host: String,

    /// Upload account name.
    #[builder(default)]
    pub username: String,

    /// Upload account key.
    #[builder(default)]
    pub key: String,

    /// Whether to connect over HTTPS.
    #[builder(default = false)]
    pub use_ssl: bool,

    /// Sign version tag: 3 (HMAC-MD5), 4 (HMAC-SHA1) or 5 (HMAC-SHA256).
    #[builder(default = 5)]
    pub sign_version: u8,

    /// Connect timeout in milliseconds.
    #[builder(default = 10_000)]
    pub connect_timeout_ms: u64,

    /// Read timeout in milliseconds.
    #[builder(default = 10_000)]
    pub read_timeout_ms: u64,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for NetStorageConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            username: String::new(),
            key: String::new(),
            use_ssl: false,
            sign_version: 5,
            connect_timeout_ms: 10_000,
            read_timeout_ms: 10_000,
            log_level: String::from("info"),
        }
    }
}

impl std::fmt::Debug for NetStorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetStorageConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("key", &"<redacted>")
            .field("use_ssl", &self.use_ssl)
            .field("sign_version", &self.sign_version)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("read_timeout_ms", &self.read_timeout_ms)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl NetStorageConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `NETSTORAGE_HOST` | empty |
    /// | `NETSTORAGE_USERNAME` | empty |
    /// | `NETSTORAGE_KEY` | empty |
    /// | `NETSTORAGE_USE_SSL` | `false` |
    /// | `NETSTORAGE_SIGN_VERSION` | `5` |
    /// | `NETSTORAGE_CONNECT_TIMEOUT_MS` | `10000` |
    /// | `NETSTORAGE_READ_TIMEOUT_MS` | `10000` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// Unparseable numbers keep their default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("NETSTORAGE_HOST") {
            config.host = v;
        }
        if let Some(v) = lookup("NETSTORAGE_USERNAME") {
            config.username = v;
        }
        if let Some(v) = lookup("NETSTORAGE_KEY") {
            config.key = v;
        }
        if let Some(v) = lookup("NETSTORAGE_USE_SSL") {
            config.use_ssl = parse_bool(&v);
        }
        if let Some(n) = lookup("NETSTORAGE_SIGN_VERSION").and_then(|v| v.trim().parse().ok()) {
            config.sign_version = n;
        }
        if let Some(n) =
            lookup("NETSTORAGE_CONNECT_TIMEOUT_MS").and_then(|v| v.trim().parse().ok())
        {
            config.connect_timeout_ms = n;
        }
        if let Some(n) = lookup("NETSTORAGE_READ_TIMEOUT_MS").and_then(|v| v.trim().parse().ok()) {
            config.read_timeout_ms = n;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// Connect and read timeouts as durations.
    #[must_use]
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: Duration::from_millis(self.connect_timeout_ms),
            read: Duration::from_millis(self.read_timeout_ms),
        }
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
