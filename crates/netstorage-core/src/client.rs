//! The storage operations facade.
//!
//! [`NetStorage`] maps each storage operation onto a verb and an [`Action`]
//! and runs it through an [`Executor`]. Read operations hand the response
//! body to the caller; mutating operations drain it and return `()`.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use chrono::{DateTime, Utc};
use http::Method;
use netstorage_auth::{Action, Checksum, Credential, RequestSigner, SignVersion};
use netstorage_http::{
    ApiRequest, Connector, Executor, HttpConnector, NetStorageError, NetStorageResult,
    ResponseBody, Timeouts, Upload,
};
use tracing::{debug, info};
use typed_builder::TypedBuilder;

use crate::checksums::{HashAlgorithm, compute_hash};
use crate::config::NetStorageConfig;

/// Listing format used when none is given.
pub const DEFAULT_FORMAT: &str = "xml";

/// Optional parameters of an upload.
#[derive(Debug, Clone, Default, TypedBuilder)]
pub struct UploadOptions {
    /// Extra wire parameters, such as `hdr_*` custom metadata.
    #[builder(default)]
    pub additional_params: BTreeMap<String, String>,
    /// Modification time to record for the file.
    #[builder(default, setter(strip_option))]
    pub mtime: Option<DateTime<Utc>>,
    /// Length of the upload in bytes.
    #[builder(default, setter(strip_option))]
    pub size: Option<u64>,
    /// Expected MD5 digest.
    #[builder(default, setter(strip_option, into))]
    pub md5: Option<Checksum>,
    /// Expected SHA-1 digest.
    #[builder(default, setter(strip_option, into))]
    pub sha1: Option<Checksum>,
    /// Expected SHA-256 digest.
    #[builder(default, setter(strip_option, into))]
    pub sha256: Option<Checksum>,
    /// Ask the server to index a zip archive. Ignored unless the destination
    /// ends in `.zip`.
    #[builder(default)]
    pub index_zip: bool,
}

/// Client for one NetStorage upload account.
///
/// # Examples
///
/// ```no_run
/// use netstorage_core::NetStorage;
///
/// let ns = NetStorage::new("example-nsu.akamaihd.net", "user1", "secret1", true)?;
/// ns.mkdir("/123456/new-dir")?;
/// let listing = ns.dir("/123456", None)?.into_bytes();
/// # Ok::<(), netstorage_http::NetStorageError>(())
/// ```
#[derive(Debug, Clone)]
pub struct NetStorage<C = HttpConnector> {
    executor: Executor<C>,
}

impl NetStorage<HttpConnector> {
    /// Connect with default timeouts and HMAC-SHA256 signing.
    ///
    /// # Errors
    ///
    /// Fails when a credential field is empty or the HTTP client cannot be
    /// built.
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        key: impl Into<String>,
        use_ssl: bool,
    ) -> NetStorageResult<Self> {
        let credential = Credential::new(hostname, username, key)?;
        let connector =
            HttpConnector::new(Timeouts::default()).map_err(NetStorageError::communication)?;
        let executor = Executor::new(connector, RequestSigner::new(credential)).with_ssl(use_ssl);
        Ok(Self { executor })
    }

    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Fails when a credential field is empty, the sign version is
    /// unsupported, or the HTTP client cannot be built.
    pub fn from_config(config: &NetStorageConfig) -> NetStorageResult<Self> {
        let credential = Credential::new(
            config.host.clone(),
            config.username.clone(),
            config.key.clone(),
        )?;
        let version = SignVersion::try_from(config.sign_version)?;
        let connector =
            HttpConnector::new(config.timeouts()).map_err(NetStorageError::communication)?;
        let signer = RequestSigner::new(credential).with_version(version);
        info!(
            host = %config.host,
            use_ssl = config.use_ssl,
            sign_version = %version,
            "netstorage client configured"
        );
        Ok(Self {
            executor: Executor::new(connector, signer).with_ssl(config.use_ssl),
        })
    }
}

impl<C: Connector> NetStorage<C> {
    /// Wrap an existing executor.
    pub fn with_executor(executor: Executor<C>) -> Self {
        Self { executor }
    }

    /// The underlying executor.
    pub fn executor(&self) -> &Executor<C> {
        &self.executor
    }

    /// Run an arbitrary request and return its body.
    pub fn execute(&self, request: ApiRequest) -> NetStorageResult<ResponseBody> {
        self.executor.execute(request)
    }

    fn fetch(&self, path: &str, action: Action) -> NetStorageResult<ResponseBody> {
        self.execute(ApiRequest::new(Method::GET, path, action))
    }

    fn apply(&self, request: ApiRequest) -> NetStorageResult<()> {
        let body = self.execute(request)?;
        let drained = body.drain().map_err(NetStorageError::communication)?;
        debug!(bytes = drained, "response body drained");
        Ok(())
    }

    /// Delete a file or symlink.
    pub fn delete(&self, path: &str) -> NetStorageResult<()> {
        self.apply(ApiRequest::new(Method::POST, path, Action::delete()))
    }

    /// List a directory. `format` defaults to [`DEFAULT_FORMAT`].
    pub fn dir(&self, path: &str, format: Option<&str>) -> NetStorageResult<ResponseBody> {
        self.fetch(path, Action::dir(format.unwrap_or(DEFAULT_FORMAT)))
    }

    /// Download a file.
    pub fn download(&self, path: &str) -> NetStorageResult<ResponseBody> {
        self.fetch(path, Action::download())
    }

    /// Report disk usage under a directory. `format` defaults to
    /// [`DEFAULT_FORMAT`].
    pub fn du(&self, path: &str, format: Option<&str>) -> NetStorageResult<ResponseBody> {
        self.fetch(path, Action::du(format.unwrap_or(DEFAULT_FORMAT)))
    }

    /// Create a directory.
    pub fn mkdir(&self, path: &str) -> NetStorageResult<()> {
        self.apply(ApiRequest::new(Method::PUT, path, Action::mkdir()))
    }

    /// Set the modification time of a file; `None` means now.
    pub fn mtime(&self, path: &str, mtime: Option<DateTime<Utc>>) -> NetStorageResult<()> {
        let mtime = mtime.unwrap_or_else(Utc::now);
        self.apply(ApiRequest::new(Method::PUT, path, Action::mtime(mtime)))
    }

    /// Rename a file or symlink to `destination`.
    pub fn rename(&self, path: &str, destination: &str) -> NetStorageResult<()> {
        self.apply(ApiRequest::new(
            Method::PUT,
            path,
            Action::rename(destination),
        ))
    }

    /// Remove an empty directory.
    pub fn rmdir(&self, path: &str) -> NetStorageResult<()> {
        self.apply(ApiRequest::new(Method::POST, path, Action::rmdir()))
    }

    /// Describe a file, symlink or directory. `format` defaults to
    /// [`DEFAULT_FORMAT`].
    pub fn stat(&self, path: &str, format: Option<&str>) -> NetStorageResult<ResponseBody> {
        self.fetch(path, Action::stat(format.unwrap_or(DEFAULT_FORMAT)))
    }

    /// Create a symlink at `path` pointing to `target`.
    pub fn symlink(&self, path: &str, target: &str) -> NetStorageResult<()> {
        self.apply(ApiRequest::new(Method::PUT, path, Action::symlink(target)))
    }

    /// Delete a directory and everything below it.
    pub fn quick_delete(&self, path: &str) -> NetStorageResult<()> {
        self.apply(ApiRequest::new(Method::PUT, path, Action::quick_delete()))
    }

    /// Upload `source` to `path`.
    ///
    /// The body is declared with `options.size` when it is known and
    /// positive, and chunked otherwise. `index_zip` is only honoured for
    /// destinations ending in `.zip`; when it is, `size` is left out of the
    /// action but still used for the body.
    pub fn upload(
        &self,
        path: &str,
        source: impl Read + Send + 'static,
        options: UploadOptions,
    ) -> NetStorageResult<()> {
        let UploadOptions {
            additional_params,
            mtime,
            size,
            md5,
            sha1,
            sha256,
            index_zip,
        } = options;

        let zip_destination = path.ends_with(".zip");
        if index_zip && !zip_destination {
            debug!(path, "index-zip ignored for non-zip destination");
        }
        let index_zip = index_zip && zip_destination;

        let mut action = Action::upload().with_additional_params(additional_params);
        if let Some(mtime) = mtime {
            action = action.with_mtime(mtime);
        }
        if let Some(size) = size {
            action = action.with_size(size);
        }
        if let Some(md5) = md5 {
            action = action.with_md5(md5);
        }
        if let Some(sha1) = sha1 {
            action = action.with_sha1(sha1);
        }
        if let Some(sha256) = sha256 {
            action = action.with_sha256(sha256);
        }
        let action = action.with_index_zip(index_zip);

        let mut upload = Upload::new(source);
        if let Some(size) = size {
            upload = upload.with_size(size);
        }
        self.apply(ApiRequest::new(Method::PUT, path, action).with_upload(upload))
    }

    /// Upload a local file, sending its SHA-256, modification time and size.
    ///
    /// # Errors
    ///
    /// A missing or unreadable file is reported as
    /// [`NetStorageError::Communication`].
    pub fn upload_file(
        &self,
        path: &str,
        file: &Path,
        additional_params: BTreeMap<String, String>,
        index_zip: bool,
    ) -> NetStorageResult<()> {
        self.upload_file_with(
            path,
            file,
            additional_params,
            index_zip,
            HashAlgorithm::Sha256,
        )
    }

    /// Like [`upload_file`](Self::upload_file), sending the digest computed
    /// with `checksum` instead of SHA-256.
    pub fn upload_file_with(
        &self,
        path: &str,
        file: &Path,
        additional_params: BTreeMap<String, String>,
        index_zip: bool,
        checksum: HashAlgorithm,
    ) -> NetStorageResult<()> {
        let metadata = fs::metadata(file).map_err(|e| inaccessible(file, &e))?;
        let mtime: DateTime<Utc> = metadata
            .modified()
            .map_err(|e| inaccessible(file, &e))?
            .into();
        let digest = File::open(file)
            .and_then(|f| compute_hash(f, checksum))
            .map(Checksum::from)
            .map_err(|e| inaccessible(file, &e))?;
        let source = File::open(file).map_err(|e| inaccessible(file, &e))?;

        debug!(
            file = %file.display(),
            size = metadata.len(),
            %checksum,
            "uploading local file"
        );
        let mut options = UploadOptions::builder()
            .additional_params(additional_params)
            .mtime(mtime)
            .size(metadata.len())
            .index_zip(index_zip)
            .build();
        match checksum {
            HashAlgorithm::Md5 => options.md5 = Some(digest),
            HashAlgorithm::Sha1 => options.sha1 = Some(digest),
            HashAlgorithm::Sha256 => options.sha256 = Some(digest),
        }
        self.upload(path, source, options)
    }

    /// Set custom metadata on a file.
    pub fn setmd(
        &self,
        path: &str,
        params: impl IntoIterator<Item = (String, String)>,
    ) -> NetStorageResult<()> {
        self.apply(ApiRequest::new(Method::PUT, path, Action::setmd(params)))
    }
}

fn inaccessible(file: &Path, err: &io::Error) -> NetStorageError {
    NetStorageError::communication(io::Error::new(
        err.kind(),
        format!("Src file is not accessible {}: {err}", file.display()),
    ))
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};
    use std::sync::{Arc, Mutex};

    use http::{Request, Response, StatusCode};
    use netstorage_http::RequestBody;

    use super::*;

    #[derive(Debug, Clone)]
    struct Seen {
        method: Method,
        path: String,
        action: String,
        content_length: Option<u64>,
        chunked: bool,
        body: Vec<u8>,
    }

    #[derive(Clone)]
    struct Recorder {
        seen: Arc<Mutex<Vec<Seen>>>,
        status: StatusCode,
    }

    impl Connector for Recorder {
        fn send(&self, request: Request<RequestBody>) -> io::Result<Response<ResponseBody>> {
            let (parts, body) = request.into_parts();
            let content_length = body.content_length();
            let chunked = body.chunk_size().is_some();
            let mut sent = Vec::new();
            if let RequestBody::Fixed { mut source, .. } | RequestBody::Chunked { mut source, .. } =
                body
            {
                source.read_to_end(&mut sent)?;
            }
            let action = parts
                .headers
                .get("x-akamai-acs-action")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_owned();
            self.seen.lock().unwrap().push(Seen {
                method: parts.method,
                path: parts.uri.path().to_owned(),
                action,
                content_length,
                chunked,
                body: sent,
            });

            let mut response = Response::new(ResponseBody::new(Cursor::new(b"<ok/>".to_vec())));
            *response.status_mut() = self.status;
            Ok(response)
        }
    }

    fn client_with_status(status: StatusCode) -> (NetStorage<Recorder>, Arc<Mutex<Vec<Seen>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Recorder {
            seen: Arc::clone(&seen),
            status,
        };
        let credential = Credential::new("example-nsu.akamaihd.net", "user1", "secret1").unwrap();
        let executor = Executor::new(recorder, RequestSigner::new(credential));
        (NetStorage::with_executor(executor), seen)
    }

    fn client() -> (NetStorage<Recorder>, Arc<Mutex<Vec<Seen>>>) {
        client_with_status(StatusCode::OK)
    }

    fn last(seen: &Arc<Mutex<Vec<Seen>>>) -> Seen {
        seen.lock().unwrap().last().cloned().unwrap()
    }

    #[test]
    fn test_should_map_operations_to_verbs_and_actions() {
        let (ns, seen) = client();
        ns.delete("/123/a.txt").unwrap();
        ns.mkdir("/123/dir").unwrap();
        ns.rmdir("/123/dir").unwrap();
        ns.rename("/123/a.txt", "/123/b.txt").unwrap();
        ns.symlink("/123/link", "/123/b.txt").unwrap();
        ns.quick_delete("/123/dir").unwrap();
        ns.setmd("/123/b.txt", [("hdr_X-rob".to_owned(), "hello2".to_owned())])
            .unwrap();

        let seen = seen.lock().unwrap();
        let calls: Vec<(Method, &str)> = seen
            .iter()
            .map(|s| (s.method.clone(), s.action.as_str()))
            .collect();
        assert_eq!(
            calls,
            vec![
                (Method::POST, "action=delete&version=1"),
                (Method::PUT, "action=mkdir&version=1"),
                (Method::POST, "action=rmdir&version=1"),
                (Method::PUT, "action=rename&destination=%2F123%2Fb.txt&version=1"),
                (Method::PUT, "action=symlink&target=%2F123%2Fb.txt&version=1"),
                (
                    Method::PUT,
                    "action=quick-delete&quick-delete=imreallyreallysure&version=1"
                ),
                (Method::PUT, "action=setmd&hdr_X-rob=hello2&version=1"),
            ]
        );
        assert!(seen.iter().all(|s| s.content_length == Some(0)));
    }

    #[test]
    fn test_should_return_body_for_read_operations() {
        let (ns, seen) = client();
        assert_eq!(ns.download("/123/a.txt").unwrap().into_bytes().unwrap(), b"<ok/>");
        let call = last(&seen);
        assert_eq!(call.method, Method::GET);
        assert_eq!(call.content_length, None);
        assert!(!call.chunked);

        ns.dir("/123", None).unwrap();
        assert_eq!(last(&seen).action, "action=dir&format=xml&version=1");
        ns.du("/123", Some("xml")).unwrap();
        assert_eq!(last(&seen).action, "action=du&format=xml&version=1");
        ns.stat("/123/a.txt", Some("json")).unwrap();
        assert_eq!(last(&seen).action, "action=stat&format=json&version=1");
    }

    #[test]
    fn test_should_send_explicit_mtime() {
        let (ns, seen) = client();
        let when = DateTime::from_timestamp(1_384_128_000, 0).unwrap();
        ns.mtime("/123/a.txt", Some(when)).unwrap();
        assert_eq!(
            last(&seen).action,
            "action=mtime&mtime=1384128000&version=1"
        );
    }

    #[test]
    fn test_should_default_mtime_to_now() {
        let (ns, seen) = client();
        let before = Utc::now().timestamp();
        ns.mtime("/123/a.txt", None).unwrap();
        let action = last(&seen).action;
        let secs: i64 = action
            .split('&')
            .find_map(|p| p.strip_prefix("mtime="))
            .unwrap()
            .parse()
            .unwrap();
        assert!(secs >= before && secs <= Utc::now().timestamp());
    }

    #[test]
    fn test_should_upload_with_size_and_digests() {
        let (ns, seen) = client();
        let options = UploadOptions::builder()
            .mtime(DateTime::from_timestamp(1_384_128_000, 0).unwrap())
            .size(73)
            .md5([0x00])
            .sha1([0x01])
            .sha256([0x02])
            .build();
        ns.upload("/123/a.txt", Cursor::new(vec![b'q'; 73]), options)
            .unwrap();

        let call = last(&seen);
        assert_eq!(call.method, Method::PUT);
        assert_eq!(
            call.action,
            "action=upload&md5=00&mtime=1384128000&sha1=01&sha256=02&size=73&version=1"
        );
        assert_eq!(call.content_length, Some(73));
        assert_eq!(call.body.len(), 73);
    }

    #[test]
    fn test_should_drop_size_from_action_for_indexed_zip() {
        let (ns, seen) = client();
        let options = UploadOptions::builder().size(5).index_zip(true).build();
        ns.upload("/123/archive.zip", Cursor::new(b"PK\x03\x04\x00".to_vec()), options)
            .unwrap();

        let call = last(&seen);
        assert_eq!(call.action, "action=upload&index-zip=1&version=1");
        assert_eq!(call.content_length, Some(5));
    }

    #[test]
    fn test_should_ignore_index_zip_for_non_zip_destination() {
        let (ns, seen) = client();
        let options = UploadOptions::builder().size(3).index_zip(true).build();
        ns.upload("/123/a.txt", Cursor::new(b"abc".to_vec()), options)
            .unwrap();
        assert_eq!(last(&seen).action, "action=upload&size=3&version=1");
    }

    #[test]
    fn test_should_chunk_upload_without_size() {
        let (ns, seen) = client();
        ns.upload("/123/stream.bin", Cursor::new(vec![1u8; 10]), UploadOptions::default())
            .unwrap();
        let call = last(&seen);
        assert!(call.chunked);
        assert_eq!(call.body.len(), 10);
        assert_eq!(call.action, "action=upload&version=1");
    }

    #[test]
    fn test_should_upload_file_with_sha256_mtime_and_size() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();
        file.flush().unwrap();
        let mtime: DateTime<Utc> = fs::metadata(file.path()).unwrap().modified().unwrap().into();

        let (ns, seen) = client();
        let params = BTreeMap::from([("hdr_owner".to_owned(), "ops".to_owned())]);
        ns.upload_file("/123/hello.txt", file.path(), params, false)
            .unwrap();

        let call = last(&seen);
        assert_eq!(
            call.action,
            format!(
                "action=upload&hdr_owner=ops&mtime={}\
                 &sha256=2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824\
                 &size=5&version=1",
                mtime.timestamp()
            )
        );
        assert_eq!(call.content_length, Some(5));
        assert_eq!(call.body, b"hello");
    }

    #[test]
    fn test_should_upload_file_with_chosen_checksum() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Lorem ipsum").unwrap();
        file.flush().unwrap();

        let (ns, seen) = client();
        let algorithm: HashAlgorithm = "md5".parse().unwrap();
        ns.upload_file_with("/123/lorem.txt", file.path(), BTreeMap::new(), false, algorithm)
            .unwrap();

        let call = last(&seen);
        assert!(call.action.contains("&md5=0956d2fbd5d5c29844a4d21ed2f76e0c&"));
        assert!(!call.action.contains("sha256="));
        assert_eq!(call.body, b"Lorem ipsum");
    }

    #[test]
    fn test_should_report_missing_upload_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        let (ns, seen) = client();
        let err = ns
            .upload_file("/123/nope.txt", &missing, BTreeMap::new(), false)
            .unwrap_err();
        match err {
            NetStorageError::Communication { source } => {
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_should_surface_api_errors_from_mutations() {
        let (ns, _seen) = client_with_status(StatusCode::FORBIDDEN);
        let err = ns.mkdir("/123/dir").unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
    }

    #[test]
    fn test_should_reject_config_with_empty_credential() {
        let config = NetStorageConfig::builder()
            .host("example-nsu.akamaihd.net".into())
            .username("user1".into())
            .build();
        let err = NetStorage::from_config(&config).unwrap_err();
        assert_eq!(err.to_string(), "key cannot be empty");
    }

    #[test]
    fn test_should_reject_config_with_unknown_sign_version() {
        let config = NetStorageConfig::builder()
            .host("h".into())
            .username("u".into())
            .key("k".into())
            .sign_version(7)
            .build();
        assert!(matches!(
            NetStorage::from_config(&config),
            Err(NetStorageError::Credential(_))
        ));
    }

    #[test]
    fn test_should_build_client_from_config() {
        let config = NetStorageConfig::builder()
            .host("example-nsu.akamaihd.net".into())
            .username("user1".into())
            .key("secret1".into())
            .use_ssl(true)
            .sign_version(4)
            .build();
        let ns = NetStorage::from_config(&config).unwrap();
        assert!(ns.executor().use_ssl());
        assert_eq!(ns.executor().signer().version(), SignVersion::HmacSha1);
    }
}
