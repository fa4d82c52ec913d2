//! Test data model for the fake IMAP server
//!
//! Provides a builder-style API for constructing mailbox state:
//!
//! ```ignore
//! let mailbox = MailboxBuilder::new()
//!     .folder("INBOX")
//!         .email(1, false, raw_rfc2822_bytes)
//!         .unreadable_email(2, false, raw_rfc2822_bytes)
//!         .unreadable_header_email(3, false, raw_rfc2822_bytes)
//!         .locked_email(4, false, raw_rfc2822_bytes)
//!     .folder("Archive")
//!         .read_only()
//!         .email(10, true, raw_rfc2822_bytes)
//!     .credentials("alice", "secret")
//!     .build();
//! ```
//!
//! The `Mailbox` is shared with the fake IMAP server behind a mutex so
//! tests can inspect `\Seen` flags after the client has run.

pub const DEFAULT_USER: &str = "testuser";
pub const DEFAULT_PASSWORD: &str = "testpass";

/// A complete mailbox: named folders plus the one account allowed in.
#[derive(Debug, Clone)]
pub struct Mailbox {
    pub folders: Vec<Folder>,
    pub user: String,
    pub password: String,
}

impl Mailbox {
    /// Look up a folder by name (case-sensitive, matching real IMAP).
    pub fn get_folder(&self, name: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.name == name)
    }

    pub fn get_folder_mut(&mut self, name: &str) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|f| f.name == name)
    }

    /// UIDs in `folder` that carry `\Seen`.
    pub fn seen_uids(&self, folder: &str) -> Vec<u32> {
        self.get_folder(folder)
            .map(|f| f.emails.iter().filter(|e| e.seen).map(|e| e.uid).collect())
            .unwrap_or_default()
    }
}

/// A single IMAP folder.
///
/// A `read_only` folder refuses SELECT but allows EXAMINE, the way a
/// shared or archived mailbox does on many servers.
#[derive(Debug, Clone)]
pub struct Folder {
    pub name: String,
    pub read_only: bool,
    pub emails: Vec<TestEmail>,
}

/// A test email stored in a folder.
///
/// - `uid`: IMAP UID, unique per folder.
/// - `seen`: whether the `\Seen` flag is set.
/// - `raw`: the complete RFC 2822 message (headers + body).
/// - `unreadable_body`: FETCH of `BODY[TEXT]` returns no body section,
///   so the client fails to read the content while headers still work.
/// - `unreadable_header`: FETCH of `BODY[HEADER]` returns no section.
/// - `flags_locked`: STORE touching this message is refused with NO.
#[derive(Debug, Clone)]
pub struct TestEmail {
    pub uid: u32,
    pub seen: bool,
    pub raw: Vec<u8>,
    pub unreadable_body: bool,
    pub unreadable_header: bool,
    pub flags_locked: bool,
}

impl TestEmail {
    pub fn new(uid: u32, seen: bool, raw: &[u8]) -> Self {
        Self {
            uid,
            seen,
            raw: raw.to_vec(),
            unreadable_body: false,
            unreadable_header: false,
            flags_locked: false,
        }
    }

    /// The header block, including the blank line that ends it.
    pub fn header(&self) -> &[u8] {
        let end = self
            .raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .map_or(self.raw.len(), |pos| pos + 4);
        &self.raw[..end]
    }

    /// Everything after the header block.
    pub fn text(&self) -> &[u8] {
        &self.raw[self.header().len()..]
    }
}

/// Builder for constructing a `Mailbox` step by step.
pub struct MailboxBuilder {
    folders: Vec<Folder>,
    user: String,
    password: String,
}

impl MailboxBuilder {
    pub fn new() -> Self {
        Self {
            folders: Vec::new(),
            user: DEFAULT_USER.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
        }
    }

    /// Add a new folder. Subsequent `.email()` calls add to this folder.
    pub fn folder(mut self, name: &str) -> Self {
        self.folders.push(Folder {
            name: name.to_string(),
            read_only: false,
            emails: Vec::new(),
        });
        self
    }

    /// Make the most recently added folder refuse SELECT.
    pub fn read_only(mut self) -> Self {
        self.current().read_only = true;
        self
    }

    /// Add an email to the most recently added folder.
    pub fn email(self, uid: u32, seen: bool, raw: &[u8]) -> Self {
        self.push(TestEmail::new(uid, seen, raw))
    }

    /// Add an email whose body cannot be fetched.
    pub fn unreadable_email(self, uid: u32, seen: bool, raw: &[u8]) -> Self {
        self.push(TestEmail {
            unreadable_body: true,
            ..TestEmail::new(uid, seen, raw)
        })
    }

    /// Add an email whose header block cannot be fetched.
    pub fn unreadable_header_email(self, uid: u32, seen: bool, raw: &[u8]) -> Self {
        self.push(TestEmail {
            unreadable_header: true,
            ..TestEmail::new(uid, seen, raw)
        })
    }

    /// Add an email whose flags cannot be changed.
    pub fn locked_email(self, uid: u32, seen: bool, raw: &[u8]) -> Self {
        self.push(TestEmail {
            flags_locked: true,
            ..TestEmail::new(uid, seen, raw)
        })
    }

    /// Replace the accepted LOGIN credentials.
    pub fn credentials(mut self, user: &str, password: &str) -> Self {
        self.user = user.to_string();
        self.password = password.to_string();
        self
    }

    /// Consume the builder and return the finished `Mailbox`.
    pub fn build(self) -> Mailbox {
        Mailbox {
            folders: self.folders,
            user: self.user,
            password: self.password,
        }
    }

    fn push(mut self, email: TestEmail) -> Self {
        self.current().emails.push(email);
        self
    }

    /// # Panics
    ///
    /// Panics if called before any `.folder()` call.
    fn current(&mut self) -> &mut Folder {
        self.folders
            .last_mut()
            .expect("call .folder() before adding to it")
    }
}
