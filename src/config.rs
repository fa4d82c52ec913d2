//! Mail store configuration
//!
//! Settings live in a flat `key=value` properties file (by default
//! `config.properties`). [`ConfigStore`] is the mutable in-memory copy:
//! it is filled by [`ConfigStore::refresh`] and edited with getters and
//! setters, but never writes the file back. Operations take an
//! immutable [`MailConfig`] snapshot instead of the store itself.

use crate::error::{Error, Result};
use crate::folder::Folder;
use crate::protocol::Protocol;
use crate::transport::{Endpoint, Security};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Default location of the properties file.
pub const DEFAULT_CONFIG_FILE: &str = "config.properties";

/// Well-known configuration keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    /// `mail.store.protocol`
    Protocol,
    /// `mail.imap.host`
    ImapHost,
    /// `mail.imap.user`
    ImapUser,
    /// `mail.pop3.host`
    Pop3Host,
    /// `mail.pop3.user`
    Pop3User,
    /// `mail.imap.folder`
    ImapFolder,
}

impl ConfigKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Protocol => "mail.store.protocol",
            Self::ImapHost => "mail.imap.host",
            Self::ImapUser => "mail.imap.user",
            Self::Pop3Host => "mail.pop3.host",
            Self::Pop3User => "mail.pop3.user",
            Self::ImapFolder => "mail.imap.folder",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable key/value settings backed by a properties file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_FILE)
    }
}

impl ConfigStore {
    /// Create an empty store bound to `path`. Nothing is read until
    /// [`refresh`](Self::refresh) is called.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: BTreeMap::new(),
        }
    }

    /// Create a store bound to `path` and load it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self::new(path);
        store.refresh()?;
        Ok(store)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop every current setting and reload the backing file.
    ///
    /// The file is parsed completely before anything is stored, so on
    /// failure the store is left empty rather than half loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, or has a
    /// malformed line.
    pub fn refresh(&mut self) -> Result<()> {
        self.values.clear();

        match read_properties(&self.path) {
            Ok(values) => {
                debug!(
                    "Loaded {} settings from {}",
                    values.len(),
                    self.path.display()
                );
                self.values = values;
                Ok(())
            }
            Err(e) => {
                error!("Failed to load {}: {}", self.path.display(), e);
                Err(e)
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: ConfigKey) -> Option<&str> {
        self.get_raw(key.as_str())
    }

    pub fn set(&mut self, key: ConfigKey, value: impl Into<String>) {
        self.set_raw(key.as_str(), value);
    }

    /// Look up any key, including ones this crate does not interpret.
    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set_raw(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn protocol(&self) -> Option<&str> {
        self.get(ConfigKey::Protocol)
    }

    pub fn set_protocol(&mut self, protocol: impl Into<String>) {
        self.set(ConfigKey::Protocol, protocol);
    }

    #[must_use]
    pub fn imap_host(&self) -> Option<&str> {
        self.get(ConfigKey::ImapHost)
    }

    pub fn set_imap_host(&mut self, host: impl Into<String>) {
        self.set(ConfigKey::ImapHost, host);
    }

    #[must_use]
    pub fn imap_user(&self) -> Option<&str> {
        self.get(ConfigKey::ImapUser)
    }

    pub fn set_imap_user(&mut self, user: impl Into<String>) {
        self.set(ConfigKey::ImapUser, user);
    }

    #[must_use]
    pub fn pop3_host(&self) -> Option<&str> {
        self.get(ConfigKey::Pop3Host)
    }

    pub fn set_pop3_host(&mut self, host: impl Into<String>) {
        self.set(ConfigKey::Pop3Host, host);
    }

    #[must_use]
    pub fn pop3_user(&self) -> Option<&str> {
        self.get(ConfigKey::Pop3User)
    }

    pub fn set_pop3_user(&mut self, user: impl Into<String>) {
        self.set(ConfigKey::Pop3User, user);
    }

    #[must_use]
    pub fn imap_folder(&self) -> Option<&str> {
        self.get(ConfigKey::ImapFolder)
    }

    /// Remember `folder` as the selected IMAP folder.
    pub fn set_imap_folder(&mut self, folder: &Folder) {
        self.set(ConfigKey::ImapFolder, folder.as_str());
    }

    /// Take an immutable copy of the current settings.
    #[must_use]
    pub fn snapshot(&self) -> MailConfig {
        MailConfig {
            values: self.values.clone(),
        }
    }
}

/// Parse `path` with Java properties rules: `=`, `:` or whitespace
/// separate key and value, `#` and `!` start comments, and values are
/// kept as written apart from `\` escapes.
fn read_properties(path: &Path) -> Result<BTreeMap<String, String>> {
    let file = File::open(path)
        .map_err(|e| Error::Config(format!("Cannot open {}: {e}", path.display())))?;

    let values = java_properties::read(BufReader::new(file))
        .map_err(|e| Error::Config(format!("Invalid entry in {}: {e}", path.display())))?;
    Ok(values.into_iter().collect())
}

/// Immutable settings passed into connection and extraction calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailConfig {
    values: BTreeMap<String, String>,
}

impl MailConfig {
    /// Build a snapshot directly from key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The configured store protocol.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchProvider`] when `mail.store.protocol` is
    /// missing or names an unsupported protocol.
    pub fn protocol(&self) -> Result<Protocol> {
        self.get(ConfigKey::Protocol.as_str())
            .ok_or_else(|| Error::NoSuchProvider("mail.store.protocol is not set".into()))?
            .parse()
    }

    /// Host for the protocol family (`mail.imap.host` or
    /// `mail.pop3.host`).
    #[must_use]
    pub fn host(&self, protocol: Protocol) -> Option<&str> {
        self.get(&format!("mail.{}.host", protocol.family()))
    }

    /// User for the protocol family (`mail.imap.user` or
    /// `mail.pop3.user`).
    #[must_use]
    pub fn user(&self, protocol: Protocol) -> Option<&str> {
        self.get(&format!("mail.{}.user", protocol.family()))
    }

    /// The selected IMAP folder, falling back to INBOX.
    #[must_use]
    pub fn folder(&self) -> Folder {
        self.get(ConfigKey::ImapFolder.as_str())
            .map_or(Folder::Inbox, Folder::from)
    }

    /// Connection parameters for `protocol` against `host`.
    ///
    /// Reads `mail.<protocol>.port`, `mail.<protocol>.starttls.enable`
    /// and `mail.<protocol>.ssl.trust`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the port is not a valid number.
    pub fn endpoint(&self, protocol: Protocol, host: &str) -> Result<Endpoint> {
        let name = protocol.as_str();

        let port = match self.get(&format!("mail.{name}.port")) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("Invalid mail.{name}.port '{raw}': {e}")))?,
            None => protocol.default_port(),
        };

        let security = if protocol.implicit_tls() {
            Security::Tls
        } else if self.flag(&format!("mail.{name}.starttls.enable")) {
            Security::StartTls
        } else {
            Security::Plain
        };

        let trust_any_certificate = self
            .get(&format!("mail.{name}.ssl.trust"))
            .is_some_and(|v| v.trim() == "*");

        Ok(Endpoint {
            host: host.to_string(),
            port,
            security,
            trust_any_certificate,
        })
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }
}
