//! Command-line arguments and their mapping onto storage operations.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use netstorage_core::{HashAlgorithm, NetStorage, NetStorageConfig};
use netstorage_http::{Connector, ResponseBody};

/// Storage operation selected with `-a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Operation {
    /// Delete a file or symlink
    Delete,
    /// List a directory
    Dir,
    /// Download a file
    Download,
    /// Show disk usage of a directory
    Du,
    /// Create a directory
    Mkdir,
    /// Set the modification time of a file to now
    Mtime,
    /// Rename a file or symlink
    Rename,
    /// Remove an empty directory
    Rmdir,
    /// Describe a file, symlink or directory
    Stat,
    /// Create a symlink
    Symlink,
    /// Upload a local file
    Upload,
    /// Delete a directory tree
    QuickDelete,
}

#[derive(Debug, Parser)]
#[command(name = "netstorage-cms")]
#[command(about = "Run a NetStorage CMS API action", long_about = None)]
pub struct Args {
    /// Action to run
    #[arg(short = 'a', long = "action", value_enum)]
    pub action: Operation,

    /// Upload account name (defaults to NETSTORAGE_USERNAME)
    #[arg(short = 'u', long = "user")]
    pub user: Option<String>,

    /// Upload account key (defaults to NETSTORAGE_KEY)
    #[arg(short = 'k', long = "key")]
    pub key: Option<String>,

    /// Local file to write the response to instead of stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Local file to upload
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Existing target path for `symlink` (e.g. /1234/example.jpg)
    #[arg(short = 't', long = "target")]
    pub target: Option<String>,

    /// New path for `rename` (e.g. /1234/example.jpg)
    #[arg(short = 'd', long = "destination")]
    pub destination: Option<String>,

    /// Ask the server to index an uploaded zip archive
    #[arg(long = "index-zip", alias = "indexzip")]
    pub index_zip: bool,

    /// Digest sent with `upload`: md5, sha1 or sha256
    #[arg(long, default_value_t = HashAlgorithm::Sha256)]
    pub checksum: HashAlgorithm,

    /// Use HTTPS
    #[arg(long)]
    pub ssl: bool,

    /// NetStorage hostname and path (example.akamaihd.net/1234/example.jpg)
    pub location: String,
}

impl Args {
    /// Overlay command-line values on top of the environment configuration.
    pub fn apply_to(&self, mut config: NetStorageConfig) -> Result<(NetStorageConfig, String)> {
        let (host, path) = split_location(&self.location)?;
        config.host = host.to_owned();
        if let Some(user) = &self.user {
            config.username.clone_from(user);
        }
        if let Some(key) = &self.key {
            config.key.clone_from(key);
        }
        config.use_ssl |= self.ssl;
        Ok((config, path))
    }
}

/// Split `host/path` into the hostname and an absolute storage path.
pub fn split_location(location: &str) -> Result<(&str, String)> {
    let Some((host, path)) = location.split_once('/') else {
        bail!("expected <host/path>, got {location:?}");
    };
    if host.is_empty() {
        bail!("missing hostname in {location:?}");
    }
    Ok((host, format!("/{path}")))
}

/// Run `args.action` against `path`, returning the body of read operations.
pub fn dispatch<C: Connector>(
    ns: &NetStorage<C>,
    args: &Args,
    path: &str,
) -> Result<Option<ResponseBody>> {
    let body = match args.action {
        Operation::Dir => Some(ns.dir(path, None)?),
        Operation::Download => Some(ns.download(path)?),
        Operation::Du => Some(ns.du(path, None)?),
        Operation::Stat => Some(ns.stat(path, None)?),
        Operation::Delete => {
            ns.delete(path)?;
            None
        }
        Operation::Mkdir => {
            ns.mkdir(path)?;
            None
        }
        Operation::Mtime => {
            ns.mtime(path, None)?;
            None
        }
        Operation::Rmdir => {
            ns.rmdir(path)?;
            None
        }
        Operation::QuickDelete => {
            ns.quick_delete(path)?;
            None
        }
        Operation::Rename => {
            let destination = args
                .destination
                .as_deref()
                .context("rename requires -d <newpath>")?;
            ns.rename(path, destination)?;
            None
        }
        Operation::Symlink => {
            let target = args
                .target
                .as_deref()
                .context("symlink requires -t <targetpath>")?;
            ns.symlink(path, target)?;
            None
        }
        Operation::Upload => {
            let file = args.file.as_deref().context("upload requires -f <srcfile>")?;
            ns.upload_file_with(path, file, BTreeMap::new(), args.index_zip, args.checksum)?;
            None
        }
    };
    Ok(body)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_should_verify_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_should_parse_sample_invocation() {
        let args = Args::try_parse_from([
            "netstorage-cms",
            "-a",
            "dir",
            "-u",
            "user1",
            "-k",
            "1234abcd",
            "example.akamaihd.net/1234",
        ])
        .unwrap();
        assert_eq!(args.action, Operation::Dir);
        assert_eq!(args.user.as_deref(), Some("user1"));
        assert_eq!(args.location, "example.akamaihd.net/1234");
        assert!(!args.index_zip);
        assert_eq!(args.checksum, HashAlgorithm::Sha256);
    }

    #[test]
    fn test_should_parse_checksum_algorithm() {
        let args = Args::try_parse_from([
            "netstorage-cms",
            "-a",
            "upload",
            "-f",
            "site.zip",
            "--checksum",
            "SHA-1",
            "host/1/site.zip",
        ])
        .unwrap();
        assert_eq!(args.checksum, HashAlgorithm::Sha1);

        let err = Args::try_parse_from([
            "netstorage-cms",
            "-a",
            "upload",
            "--checksum",
            "crc32",
            "host/1/site.zip",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("unknown hash algorithm: crc32"));
    }

    #[test]
    fn test_should_parse_quick_delete_and_index_zip() {
        let args = Args::try_parse_from([
            "netstorage-cms",
            "-a",
            "quick-delete",
            "--index-zip",
            "host/1/dir",
        ])
        .unwrap();
        assert_eq!(args.action, Operation::QuickDelete);
        assert!(args.index_zip);
    }

    #[test]
    fn test_should_reject_unknown_action() {
        assert!(Args::try_parse_from(["netstorage-cms", "-a", "chmod", "host/1"]).is_err());
    }

    #[test]
    fn test_should_split_location() {
        let (host, path) = split_location("example.akamaihd.net/1234/a b.jpg").unwrap();
        assert_eq!(host, "example.akamaihd.net");
        assert_eq!(path, "/1234/a b.jpg");

        assert!(split_location("example.akamaihd.net").is_err());
        assert!(split_location("/1234").is_err());
    }

    #[test]
    fn test_should_overlay_arguments_on_config() {
        let args = Args::try_parse_from([
            "netstorage-cms",
            "-a",
            "stat",
            "-u",
            "user1",
            "--ssl",
            "host.example/123/file",
        ])
        .unwrap();
        let base = NetStorageConfig::builder().key("from-env".into()).build();
        let (config, path) = args.apply_to(base).unwrap();
        assert_eq!(config.host, "host.example");
        assert_eq!(config.username, "user1");
        assert_eq!(config.key, "from-env");
        assert!(config.use_ssl);
        assert_eq!(path, "/123/file");
    }
}
