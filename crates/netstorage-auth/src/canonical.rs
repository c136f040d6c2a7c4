//! Canonical serialization of actions and request paths.
//!
//! The action header is the form-encoded `key=value&...` rendering of an
//! [`Action`], with keys in byte-wise ascending order:
//!
//! ```text
//! action=upload&md5=00&mtime=1384128000&sha1=01&sha256=02&size=73&version=1
//! ```
//!
//! The server recomputes the signature over this exact string, so the output
//! must not depend on the order in which parameters were set.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::action::{ACTION_VERSION, Action, FIELDS};
use crate::format::resolve;

/// Characters that must be percent-encoded in a request path segment.
///
/// Everything except the RFC 3986 unreserved characters is encoded; `/` is
/// handled by splitting the path into segments.
const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Segments whose escapes do not decode to UTF-8 keep those escapes.
const RAW_SEGMENT_ENCODE_SET: &AsciiSet = &PATH_SEGMENT_ENCODE_SET.remove(b'%');

/// Collect the wire parameters of an action into a sorted map.
///
/// Declared fields are resolved first; additional parameters are merged last
/// and therefore overwrite a declared field with the same wire name.
#[must_use]
pub fn action_params(action: &Action) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    params.insert("version".to_owned(), ACTION_VERSION.to_string());
    params.insert("action".to_owned(), action.name().to_owned());

    for field in FIELDS {
        if let Some(value) = resolve(field.format, (field.get)(action), field.include_null) {
            params.insert(field.wire_name.to_owned(), value);
        }
    }

    params.extend(
        action
            .additional_params()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );

    params
}

/// Serialize an action into its canonical action-header value.
///
/// # Examples
///
/// ```
/// use netstorage_auth::Action;
/// use netstorage_auth::canonical::serialize_action;
///
/// assert_eq!(
///     serialize_action(&Action::rename("/foo")),
///     "action=rename&destination=%2Ffoo&version=1"
/// );
/// ```
#[must_use]
pub fn serialize_action(action: &Action) -> String {
    build_query_string(&action_params(action))
}

/// Render sorted parameters as a form-encoded query string.
///
/// Spaces encode to `+`; only `A-Z a-z 0-9 * - . _` pass through unescaped.
#[must_use]
pub fn build_query_string(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", form_encode(k), form_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn form_encode(input: &str) -> String {
    form_urlencoded::byte_serialize(input.as_bytes()).collect()
}

/// Normalize a request path: ensure a leading `/` and percent-encode each
/// segment with URL path rules.
///
/// Segments are decoded before encoding so an already-encoded path is not
/// encoded twice.
///
/// # Examples
///
/// ```
/// use netstorage_auth::canonical::build_request_path;
///
/// assert_eq!(build_request_path("123456/dir/file.txt"), "/123456/dir/file.txt");
/// assert_eq!(build_request_path("/a b"), "/a%20b");
/// assert_eq!(build_request_path("/a%20b"), "/a%20b");
/// ```
#[must_use]
pub fn build_request_path(path: &str) -> String {
    let trimmed = path.strip_prefix('/').unwrap_or(path);

    let encoded: Vec<String> = trimmed
        .split('/')
        .map(|segment| match percent_decode_str(segment).decode_utf8() {
            Ok(decoded) => utf8_percent_encode(&decoded, PATH_SEGMENT_ENCODE_SET).to_string(),
            Err(_) => utf8_percent_encode(segment, RAW_SEGMENT_ENCODE_SET).to_string(),
        })
        .collect();

    format!("/{}", encoded.join("/"))
}
