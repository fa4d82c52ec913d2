//! Interchange records
//!
//! Extracted messages leave the crate as JSON arrays of one of two
//! record shapes:
//!
//! ```text
//! [{"type": "Email", "fields": [{"From": "a@b.com"}, ...], "data": "body"}]
//! [{"subject": "Hello", "body": "body"}]
//! ```
//!
//! `data` and `body` are omitted when the message content could not
//! be read.

use crate::error::Result;
use crate::message::Header;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Type discriminator carried by every [`EmailRecord`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum RecordKind {
    #[default]
    Email,
}

/// A message shaped for interchange: headers plus opaque content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailRecord {
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub fields: Vec<Header>,
    /// The body as text. JSON has no byte strings, so bytes that are not
    /// valid UTF-8 become U+FFFD here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl EmailRecord {
    #[must_use]
    pub const fn new(fields: Vec<Header>, data: Option<String>) -> Self {
        Self {
            kind: RecordKind::Email,
            fields,
            data,
        }
    }
}

/// A header serializes as a single-entry object `{name: value}`.
impl Serialize for Header {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.value)?;
        map.end()
    }
}

/// Subject and body of one message, produced by copy extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopyRecord {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Body bytes as record text. Valid UTF-8 is moved without copying;
/// anything else is decoded lossily.
pub(crate) fn body_text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Serialize records as a compact JSON array, preserving order.
///
/// # Errors
///
/// Returns [`Error::Serialize`](crate::Error::Serialize) if
/// serialization fails.
pub fn to_json<T: Serialize>(records: &[T]) -> Result<String> {
    Ok(serde_json::to_string(records)?)
}

/// Serialize records as an indented JSON array, preserving order.
///
/// # Errors
///
/// Returns [`Error::Serialize`](crate::Error::Serialize) if
/// serialization fails.
pub fn to_json_pretty<T: Serialize>(records: &[T]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}
