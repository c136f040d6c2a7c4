//! NetStorage CMS - command-line client for the NetStorage HTTP API.
//!
//! # Usage
//!
//! ```text
//! netstorage-cms -a dir -u user1 -k 1234abcd example.akamaihd.net/1234
//! netstorage-cms -a upload -f ./site.zip --index-zip example.akamaihd.net/1234/site.zip
//! netstorage-cms -a upload -f ./a.jpg --checksum md5 example.akamaihd.net/1234/a.jpg
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `NETSTORAGE_USERNAME` | *(unset)* | Account name when `-u` is omitted |
//! | `NETSTORAGE_KEY` | *(unset)* | Account key when `-k` is omitted |
//! | `NETSTORAGE_USE_SSL` | `false` | Connect over HTTPS |
//! | `NETSTORAGE_SIGN_VERSION` | `5` | 3 = HMAC-MD5, 4 = HMAC-SHA1, 5 = HMAC-SHA256 |
//! | `NETSTORAGE_CONNECT_TIMEOUT_MS` | `10000` | Connect timeout |
//! | `NETSTORAGE_READ_TIMEOUT_MS` | `10000` | Read timeout |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod cli;

use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use clap::Parser;
use netstorage_core::{NetStorage, NetStorageConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, dispatch};

/// Buffer size used when writing a response body out.
const OUTPUT_BUFFER_SIZE: usize = 1024 * 1024;

/// Initialize the tracing subscriber on stderr.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let (config, path) = args.apply_to(NetStorageConfig::from_env())?;
    init_tracing(&config.log_level)?;

    let ns = NetStorage::from_config(&config).context("invalid NetStorage configuration")?;
    info!(action = ?args.action, host = %config.host, path = %path, "running action");

    let Some(mut body) = dispatch(&ns, args, &path)? else {
        println!("Success.");
        return Ok(());
    };

    let written = match &args.output {
        Some(output) => {
            let file = File::create(output)
                .with_context(|| format!("failed to create {}", output.display()))?;
            let mut out = BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, file);
            let n = io::copy(&mut body, &mut out).context("failed to write response")?;
            out.flush()?;
            n
        }
        None => {
            let mut out = BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, io::stdout().lock());
            let n = io::copy(&mut body, &mut out).context("failed to write response")?;
            out.flush()?;
            n
        }
    };
    info!(bytes = written, "response written");
    Ok(())
}

fn main() -> Result<()> {
    run(&Args::parse())
}
