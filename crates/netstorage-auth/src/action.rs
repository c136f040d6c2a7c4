//! The action model: one NetStorage API call and its parameters.
//!
//! An [`Action`] is a flat bag of optional, typed parameters plus the action
//! name. Which parameters reach the wire, under which name and with which
//! formatting is decided by the declared [`FIELDS`] table rather than by the
//! struct layout, so the serializer never has to introspect the type.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::format::{ParamValue, ValueFormat};

/// Protocol version emitted as the `version` parameter of every action.
pub const ACTION_VERSION: u32 = 1;

/// Confirmation token the API requires for `quick-delete`.
pub const QUICK_DELETE_CONFIRMATION: &str = "imreallyreallysure";

/// A digest sent alongside an upload (`md5`, `sha1` or `sha256`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum(Vec<u8>);

impl Checksum {
    /// The raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Checksum {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Checksum {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Checksum {
    fn from(bytes: [u8; N]) -> Self {
        Self(bytes.to_vec())
    }
}

/// One API action and its parameters.
///
/// # Examples
///
/// ```
/// use netstorage_auth::Action;
///
/// let action = Action::upload().with_size(123).with_index_zip(true);
/// // index-zip rewrites the uploaded archive, so a declared size is dropped.
/// assert_eq!(action.size(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Action {
    name: String,
    format: Option<String>,
    quick_delete: Option<String>,
    destination: Option<String>,
    target: Option<String>,
    mtime: Option<DateTime<Utc>>,
    size: Option<u64>,
    md5: Option<Checksum>,
    sha1: Option<Checksum>,
    sha256: Option<Checksum>,
    index_zip: bool,
    additional_params: BTreeMap<String, String>,
}

impl Action {
    /// Create an action with the given name and no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// `download`: fetch a file.
    #[must_use]
    pub fn download() -> Self {
        Self::new("download")
    }

    /// `dir`: list a directory in the given response format.
    #[must_use]
    pub fn dir(format: impl Into<String>) -> Self {
        Self::new("dir").with_format(format)
    }

    /// `du`: disk usage of a directory in the given response format.
    #[must_use]
    pub fn du(format: impl Into<String>) -> Self {
        Self::new("du").with_format(format)
    }

    /// `stat`: metadata of a path in the given response format.
    #[must_use]
    pub fn stat(format: impl Into<String>) -> Self {
        Self::new("stat").with_format(format)
    }

    /// `mkdir`: create a directory.
    #[must_use]
    pub fn mkdir() -> Self {
        Self::new("mkdir")
    }

    /// `rmdir`: remove an empty directory.
    #[must_use]
    pub fn rmdir() -> Self {
        Self::new("rmdir")
    }

    /// `delete`: remove a file or symlink.
    #[must_use]
    pub fn delete() -> Self {
        Self::new("delete")
    }

    /// `mtime`: set the modification time of a file.
    #[must_use]
    pub fn mtime(mtime: DateTime<Utc>) -> Self {
        Self::new("mtime").with_mtime(mtime)
    }

    /// `rename`: move a file to `destination`.
    #[must_use]
    pub fn rename(destination: impl Into<String>) -> Self {
        Self::new("rename").with_destination(destination)
    }

    /// `symlink`: create a symlink pointing at `target`.
    #[must_use]
    pub fn symlink(target: impl Into<String>) -> Self {
        Self::new("symlink").with_target(target)
    }

    /// `quick-delete`: recursively delete a directory tree.
    #[must_use]
    pub fn quick_delete() -> Self {
        let mut action = Self::new("quick-delete");
        action.quick_delete = Some(QUICK_DELETE_CONFIRMATION.to_owned());
        action
    }

    /// `upload`: store a file.
    #[must_use]
    pub fn upload() -> Self {
        Self::new("upload")
    }

    /// `setmd`: set custom metadata, carried as additional parameters.
    #[must_use]
    pub fn setmd(params: impl IntoIterator<Item = (String, String)>) -> Self {
        Self::new("setmd").with_additional_params(params)
    }

    /// Set the response format (`xml`, ...).
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Set the rename destination.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Set the symlink target.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Set the modification time.
    #[must_use]
    pub fn with_mtime(mut self, mtime: DateTime<Utc>) -> Self {
        self.mtime = Some(mtime);
        self
    }

    /// Declare the size of the uploaded content.
    ///
    /// Ignored while index-zip is enabled.
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self.reconcile_size();
        self
    }

    /// Attach the MD5 digest of the uploaded content.
    #[must_use]
    pub fn with_md5(mut self, md5: impl Into<Checksum>) -> Self {
        self.md5 = Some(md5.into());
        self
    }

    /// Attach the SHA-1 digest of the uploaded content.
    #[must_use]
    pub fn with_sha1(mut self, sha1: impl Into<Checksum>) -> Self {
        self.sha1 = Some(sha1.into());
        self
    }

    /// Attach the SHA-256 digest of the uploaded content.
    #[must_use]
    pub fn with_sha256(mut self, sha256: impl Into<Checksum>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    /// Ask the server to index an uploaded zip archive.
    ///
    /// Enabling it drops any declared size.
    #[must_use]
    pub fn with_index_zip(mut self, index_zip: bool) -> Self {
        self.index_zip = index_zip;
        self.reconcile_size();
        self
    }

    /// Merge extra key/value pairs (e.g. `hdr_*` metadata) into the action.
    ///
    /// These are emitted verbatim and win over a declared parameter with the
    /// same wire name.
    #[must_use]
    pub fn with_additional_params(
        mut self,
        params: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.additional_params.extend(params);
        self
    }

    /// The action name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The response format, if set.
    #[must_use]
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// The rename destination, if set.
    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// The symlink target, if set.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// The modification time, if set.
    #[must_use]
    pub fn modified_time(&self) -> Option<DateTime<Utc>> {
        self.mtime
    }

    /// The declared upload size, if set and not dropped by index-zip.
    #[must_use]
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Whether index-zip is enabled.
    #[must_use]
    pub fn index_zip(&self) -> bool {
        self.index_zip
    }

    /// The caller-supplied extra parameters.
    #[must_use]
    pub fn additional_params(&self) -> &BTreeMap<String, String> {
        &self.additional_params
    }

    // index-zip mutates the stored archive, so a pre-declared size would not match.
    fn reconcile_size(&mut self) {
        if self.index_zip {
            self.size = None;
        }
    }
}

/// A declared action parameter: its wire name, formatter and accessor.
#[derive(Clone, Copy)]
pub struct Field {
    /// Field name on [`Action`].
    pub name: &'static str,
    /// Key emitted in the action header.
    pub wire_name: &'static str,
    /// Formatter applied to the value.
    pub format: ValueFormat,
    /// Emit an empty value instead of omitting the key when unset.
    pub include_null: bool,
    /// Reads the field from an action.
    pub get: for<'a> fn(&'a Action) -> Option<ParamValue<'a>>,
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("wire_name", &self.wire_name)
            .field("format", &self.format)
            .field("include_null", &self.include_null)
            .finish_non_exhaustive()
    }
}

/// Every declared action parameter, excluding `version`, `action` and the
/// additional-params bag, which the serializer handles itself.
pub const FIELDS: &[Field] = &[
    Field {
        name: "format",
        wire_name: "format",
        format: ValueFormat::Plain,
        include_null: false,
        get: |a| a.format.as_deref().map(ParamValue::Text),
    },
    Field {
        name: "quick_delete",
        wire_name: "quick-delete",
        format: ValueFormat::Plain,
        include_null: false,
        get: |a| a.quick_delete.as_deref().map(ParamValue::Text),
    },
    Field {
        name: "destination",
        wire_name: "destination",
        format: ValueFormat::Plain,
        include_null: false,
        get: |a| a.destination.as_deref().map(ParamValue::Text),
    },
    Field {
        name: "target",
        wire_name: "target",
        format: ValueFormat::Plain,
        include_null: false,
        get: |a| a.target.as_deref().map(ParamValue::Text),
    },
    Field {
        name: "mtime",
        wire_name: "mtime",
        format: ValueFormat::EpochSeconds,
        include_null: false,
        get: |a| a.mtime.map(ParamValue::Timestamp),
    },
    Field {
        name: "size",
        wire_name: "size",
        format: ValueFormat::Plain,
        include_null: false,
        get: |a| a.size.map(ParamValue::Integer),
    },
    Field {
        name: "md5",
        wire_name: "md5",
        format: ValueFormat::Hex,
        include_null: false,
        get: |a| a.md5.as_ref().map(|c| ParamValue::Bytes(c.as_bytes())),
    },
    Field {
        name: "sha1",
        wire_name: "sha1",
        format: ValueFormat::Hex,
        include_null: false,
        get: |a| a.sha1.as_ref().map(|c| ParamValue::Bytes(c.as_bytes())),
    },
    Field {
        name: "sha256",
        wire_name: "sha256",
        format: ValueFormat::Hex,
        include_null: false,
        get: |a| a.sha256.as_ref().map(|c| ParamValue::Bytes(c.as_bytes())),
    },
    Field {
        name: "index_zip",
        wire_name: "index-zip",
        format: ValueFormat::Presence,
        include_null: false,
        get: |a| Some(ParamValue::Flag(a.index_zip)),
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_drop_size_when_index_zip_enabled_after() {
        let action = Action::upload().with_size(123).with_index_zip(true);
        assert_eq!(action.size(), None);
        assert!(action.index_zip());
    }

    #[test]
    fn test_should_drop_size_when_index_zip_enabled_before() {
        let action = Action::upload().with_index_zip(true).with_size(123);
        assert_eq!(action.size(), None);
    }

    #[test]
    fn test_should_keep_size_when_index_zip_disabled() {
        let action = Action::upload().with_size(123).with_index_zip(false);
        assert_eq!(action.size(), Some(123));

        let action = Action::upload().with_index_zip(false).with_size(7);
        assert_eq!(action.size(), Some(7));
    }

    #[test]
    fn test_should_reconcile_size_idempotently() {
        let once = Action::upload().with_size(10).with_index_zip(true);
        let twice = once.clone().with_index_zip(true).with_size(10);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_should_set_quick_delete_confirmation() {
        let action = Action::quick_delete();
        assert_eq!(action.name(), "quick-delete");
        assert_eq!(action.quick_delete.as_deref(), Some(QUICK_DELETE_CONFIRMATION));
    }

    #[test]
    fn test_should_build_named_actions() {
        assert_eq!(Action::rename("/foo").destination(), Some("/foo"));
        assert_eq!(Action::symlink("/bar").target(), Some("/bar"));
        assert_eq!(Action::dir("xml").format(), Some("xml"));
        assert_eq!(Action::stat("xml").name(), "stat");
    }

    #[test]
    fn test_should_declare_unique_wire_names() {
        let mut names: Vec<&str> = FIELDS.iter().map(|f| f.wire_name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FIELDS.len());
        assert!(!names.contains(&"version"));
        assert!(!names.contains(&"action"));
    }

    #[test]
    fn test_should_accept_fixed_size_digest() {
        let action = Action::upload().with_md5([0u8; 16]);
        assert_eq!(action.md5.as_ref().map(|c| c.as_bytes().len()), Some(16));
    }
}
