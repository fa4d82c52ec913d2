//! Mailbox folders and folder selection
//!
//! Provides a strongly-typed enum for folders instead of raw strings,
//! the modes a folder can be opened in, and the pure selection helpers
//! used by both programmatic callers and the interactive prompt.

use crate::error::{Error, Result};
use std::fmt;

/// A mailbox folder.
///
/// Well-known folders have dedicated variants that map to their
/// standard IMAP names. For user-created folders, use
/// [`Folder::custom`].
///
/// # Examples
///
/// ```
/// use mailbox_extract::Folder;
///
/// let inbox = Folder::Inbox;
/// assert_eq!(inbox.as_str(), "INBOX");
///
/// let custom = Folder::custom("My Projects");
/// assert_eq!(custom.as_str(), "My Projects");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Folder {
    /// The INBOX folder (RFC 3501 required, case-insensitive).
    Inbox,
    /// Sent messages.
    Sent,
    /// Draft messages.
    Drafts,
    /// Deleted messages.
    Trash,
    /// Spam / junk messages.
    Spam,
    /// Archived messages.
    Archive,
    /// A user-defined or server-specific folder.
    Custom(String),
}

impl Folder {
    /// Create a folder for a user-defined or non-standard mailbox.
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// The folder name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Inbox => "INBOX",
            Self::Sent => "Sent",
            Self::Drafts => "Drafts",
            Self::Trash => "Trash",
            Self::Spam => "Spam",
            Self::Archive => "Archive",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Folder {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case("inbox") {
            Self::Inbox
        } else {
            match s {
                "Sent" => Self::Sent,
                "Drafts" => Self::Drafts,
                "Trash" => Self::Trash,
                "Spam" => Self::Spam,
                "Archive" => Self::Archive,
                other => Self::Custom(other.to_string()),
            }
        }
    }
}

impl From<String> for Folder {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

/// How a folder is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FolderMode {
    /// Messages can be read but flags cannot change (IMAP `EXAMINE`).
    ReadOnly,
    /// Flags may be changed (IMAP `SELECT`).
    ReadWrite,
}

impl fmt::Display for FolderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReadOnly => "read-only",
            Self::ReadWrite => "read-write",
        })
    }
}

/// Counters reported when a folder is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderStatus {
    /// Number of messages in the folder.
    pub exists: u32,
    /// Number of messages new since the last session.
    pub recent: u32,
    /// Sequence number of the first unseen message, when known.
    pub first_unseen: Option<u32>,
}

/// Pick a folder from a listing by index.
///
/// Indexes address `folders` directly, but slot 0 is never offered:
/// the valid range is `1..folders.len()`, matching what
/// [`prompt_folder_index`](crate::prompt_folder_index) shows.
///
/// # Errors
///
/// Returns [`Error::FolderIndexOutOfRange`] for index 0 or any index
/// at or past the end of the listing.
///
/// # Examples
///
/// ```
/// use mailbox_extract::{Folder, select_by_index};
///
/// let folders = vec![Folder::Inbox, Folder::Sent, Folder::Trash];
/// assert_eq!(select_by_index(&folders, 1).unwrap(), &Folder::Sent);
/// assert!(select_by_index(&folders, 0).is_err());
/// assert!(select_by_index(&folders, 3).is_err());
/// ```
pub fn select_by_index(folders: &[Folder], index: usize) -> Result<&Folder> {
    if index == 0 || index >= folders.len() {
        return Err(Error::FolderIndexOutOfRange {
            index,
            len: folders.len(),
        });
    }
    Ok(&folders[index])
}

/// Pick a folder from a listing by name.
///
/// `INBOX` matches case-insensitively; other names are exact.
///
/// # Errors
///
/// Returns [`Error::FolderNotFound`] if no folder has that name.
pub fn select_by_name<'a>(folders: &'a [Folder], name: &str) -> Result<&'a Folder> {
    let wanted = Folder::from(name);
    folders
        .iter()
        .find(|f| **f == wanted)
        .ok_or_else(|| Error::FolderNotFound(name.to_string()))
}
