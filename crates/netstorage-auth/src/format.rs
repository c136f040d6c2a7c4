//! Per-field value formatting for action parameters.
//!
//! Every declared action parameter carries a [`ValueFormat`] that maps its
//! typed value to the string placed in the action header, or to nothing when
//! the parameter should be left out entirely.

use chrono::{DateTime, Utc};

/// A borrowed, typed parameter value as read from an [`Action`](crate::Action).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamValue<'a> {
    /// Free-form text.
    Text(&'a str),
    /// An unsigned integer, e.g. a byte size.
    Integer(u64),
    /// A point in time.
    Timestamp(DateTime<Utc>),
    /// Raw bytes, e.g. a digest.
    Bytes(&'a [u8]),
    /// A boolean switch.
    Flag(bool),
}

/// How a parameter value is rendered on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    /// The value's natural string or decimal form.
    Plain,
    /// Whole seconds since the Unix epoch (UTC).
    EpochSeconds,
    /// Lower-case hex, two digits per byte.
    Hex,
    /// `"1"` when set, omitted otherwise. There is no false encoding.
    Presence,
}

impl ValueFormat {
    /// Render `value`, returning `None` when the parameter must be omitted.
    ///
    /// # Examples
    ///
    /// ```
    /// use netstorage_auth::format::{ParamValue, ValueFormat};
    ///
    /// assert_eq!(ValueFormat::Hex.apply(ParamValue::Bytes(&[0x0a, 0xff])).as_deref(), Some("0aff"));
    /// assert_eq!(ValueFormat::Presence.apply(ParamValue::Flag(false)), None);
    /// ```
    #[must_use]
    pub fn apply(self, value: ParamValue<'_>) -> Option<String> {
        match (self, value) {
            (Self::EpochSeconds, ParamValue::Timestamp(ts)) => Some(ts.timestamp().to_string()),
            (Self::Hex, ParamValue::Bytes(bytes)) => Some(hex::encode(bytes)),
            (Self::Presence, ParamValue::Flag(set)) => set.then(|| "1".to_owned()),
            (_, value) => plain(value),
        }
    }
}

fn plain(value: ParamValue<'_>) -> Option<String> {
    match value {
        ParamValue::Text(text) => Some(text.to_owned()),
        ParamValue::Integer(n) => Some(n.to_string()),
        ParamValue::Timestamp(ts) => Some(ts.timestamp().to_string()),
        ParamValue::Bytes(bytes) => Some(hex::encode(bytes)),
        ParamValue::Flag(set) => Some(set.to_string()),
    }
}

/// Resolve a possibly-absent value into its wire form.
///
/// Absent values are omitted unless `include_null` is set, in which case an
/// empty string is emitted for the key.
#[must_use]
pub fn resolve(format: ValueFormat, value: Option<ParamValue<'_>>, include_null: bool) -> Option<String> {
    match value.and_then(|v| format.apply(v)) {
        Some(rendered) => Some(rendered),
        None if include_null => Some(String::new()),
        None => None,
    }
}
