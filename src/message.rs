//! Message model shared by both store backends

use crate::error::{Error, Result};
use crate::record::{EmailRecord, body_text};
use std::fmt;

/// How a message is addressed inside an open folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageRef {
    /// IMAP UID; stable for the life of the folder.
    Uid(u32),
    /// 1-based position in the folder (IMAP sequence number, POP3
    /// message number).
    Seq(u32),
}

impl MessageRef {
    #[must_use]
    pub const fn number(self) -> u32 {
        match self {
            Self::Uid(n) | Self::Seq(n) => n,
        }
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uid(n) => write!(f, "UID {n}"),
            Self::Seq(n) => write!(f, "message {n}"),
        }
    }
}

/// One header line, unfolded and decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Split a raw header block into its header lines.
///
/// Order is preserved and repeated names each keep their own entry.
/// Anything after the blank line ending the header block is ignored.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the header block is malformed.
pub fn parse_headers(raw: &[u8]) -> Result<Vec<Header>> {
    let (headers, _) = mailparse::parse_headers(raw).map_err(|e| Error::Parse(e.to_string()))?;

    Ok(headers
        .iter()
        .map(|h| Header::new(h.get_key(), h.get_value()))
        .collect())
}

/// A message as read from the store, before shaping into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub reference: MessageRef,
    pub headers: Vec<Header>,
    /// The message body exactly as the server sent it, or `None` if
    /// it could not be read. Conversion to text happens only in
    /// [`into_record`](Self::into_record).
    pub content: Option<Vec<u8>>,
}

impl RawMessage {
    /// First value of header `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.header("Subject")
    }

    /// Shape into the interchange record.
    #[must_use]
    pub fn into_record(self) -> EmailRecord {
        EmailRecord::new(self.headers, self.content.map(body_text))
    }
}
