//! Message flags and flag predicates
//!
//! Extraction only ever reads or sets `\Seen`, so [`Flag`] names just
//! that system flag. [`FlagTerm`] is the search predicate selecting
//! messages by whether a flag is set.

use std::fmt;

/// An IMAP message flag.
///
/// # Examples
///
/// ```
/// use mailbox_extract::Flag;
///
/// assert_eq!(Flag::Seen.as_imap_str(), "\\Seen");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Message has been read (`\Seen`).
    Seen,
}

impl Flag {
    /// The IMAP wire representation of this flag, including the
    /// leading backslash.
    #[must_use]
    pub const fn as_imap_str(&self) -> &'static str {
        match self {
            Self::Seen => "\\Seen",
        }
    }

    /// The `+FLAGS` item that adds this flag in a STORE command.
    #[must_use]
    pub fn store_add(&self) -> String {
        format!("+FLAGS ({})", self.as_imap_str())
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_imap_str())
    }
}

/// Selects messages whose `flag` is (or is not) set.
///
/// # Examples
///
/// ```
/// use mailbox_extract::{Flag, FlagTerm};
///
/// let unread = FlagTerm::unset(Flag::Seen);
/// assert_eq!(unread.to_search_query(), "UNSEEN");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlagTerm {
    pub flag: Flag,
    pub set: bool,
}

impl FlagTerm {
    /// Messages that do not carry `flag`.
    #[must_use]
    pub const fn unset(flag: Flag) -> Self {
        Self { flag, set: false }
    }

    /// The IMAP SEARCH criterion for this predicate (RFC 3501
    /// Section 6.4.4).
    #[must_use]
    pub const fn to_search_query(&self) -> &'static str {
        match (&self.flag, self.set) {
            (Flag::Seen, true) => "SEEN",
            (Flag::Seen, false) => "UNSEEN",
        }
    }
}
