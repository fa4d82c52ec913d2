//! Authenticated mail store sessions
//!
//! [`sign_in`] is the only way to obtain a [`Store`], so a handle that
//! exists is always connected and logged in. The store remembers which
//! folder is open and in which mode, and refuses flag changes on a
//! folder opened read-only.

use crate::config::MailConfig;
use crate::error::{Error, Result};
use crate::flag::{Flag, FlagTerm};
use crate::folder::{Folder, FolderMode, FolderStatus};
use crate::imap::ImapStore;
use crate::message::{Header, MessageRef, parse_headers};
use crate::pop3::Pop3Store;
use crate::protocol::Protocol;
use tracing::{debug, error, info};

enum Backend {
    Imap(ImapStore),
    Pop3(Pop3Store),
}

#[derive(Debug, Clone)]
struct OpenFolder {
    folder: Folder,
    mode: FolderMode,
}

/// An authenticated connection to a remote mailbox.
pub struct Store {
    protocol: Protocol,
    backend: Backend,
    open: Option<OpenFolder>,
}

/// Connect and authenticate against `host`.
///
/// The protocol and transport settings come from `config`; see
/// [`MailConfig::endpoint`]. A failure is logged once and returned.
///
/// # Errors
///
/// - [`Error::NoSuchProvider`] if the configured protocol is missing or
///   unsupported.
/// - [`Error::Io`] or [`Error::Tls`] if the server cannot be reached.
/// - [`Error::Auth`] if the credentials are rejected.
pub async fn sign_in(config: &MailConfig, host: &str, user: &str, password: &str) -> Result<Store> {
    let result = connect(config, host, user, password).await;
    if let Err(e) = &result {
        error!("Sign-in to {} as {} failed: {}", host, user, e);
    }
    result
}

/// [`sign_in`] using the host and user configured for the protocol
/// family (`mail.imap.*` or `mail.pop3.*`).
///
/// # Errors
///
/// Same as [`sign_in`], plus [`Error::Config`] when the host or user
/// setting is missing.
pub async fn sign_in_configured(config: &MailConfig, password: &str) -> Result<Store> {
    let settings = config.protocol().and_then(|protocol| {
        let host = config
            .host(protocol)
            .ok_or_else(|| Error::Config(format!("mail.{}.host is not set", protocol.family())))?;
        let user = config
            .user(protocol)
            .ok_or_else(|| Error::Config(format!("mail.{}.user is not set", protocol.family())))?;
        Ok((host, user))
    });

    match settings {
        Ok((host, user)) => sign_in(config, host, user, password).await,
        Err(e) => {
            error!("Sign-in not attempted: {}", e);
            Err(e)
        }
    }
}

async fn connect(config: &MailConfig, host: &str, user: &str, password: &str) -> Result<Store> {
    let protocol = config.protocol()?;
    let endpoint = config.endpoint(protocol, host)?;
    debug!("Signing in to {} over {}", endpoint.address(), protocol);

    let backend = if protocol.is_imap() {
        Backend::Imap(ImapStore::connect(&endpoint, user, password).await?)
    } else {
        Backend::Pop3(Pop3Store::connect(&endpoint, user, password).await?)
    };

    Ok(Store {
        protocol,
        backend,
        open: None,
    })
}

impl Store {
    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// The currently open folder and its mode.
    #[must_use]
    pub fn open_folder_info(&self) -> Option<(&Folder, FolderMode)> {
        self.open.as_ref().map(|o| (&o.folder, o.mode))
    }

    /// List every folder in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the LIST command fails.
    pub async fn list_folders(&mut self) -> Result<Vec<Folder>> {
        match &mut self.backend {
            Backend::Imap(imap) => imap.list_folders().await,
            Backend::Pop3(pop3) => Ok(pop3.list_folders()),
        }
    }

    /// Open `folder` read-write, falling back to read-only when write
    /// access is refused. Returns the mode that was obtained.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FolderNotFound`] if the folder cannot be opened
    /// in either mode; no folder is left open.
    pub async fn open_folder(&mut self, folder: &Folder) -> Result<FolderMode> {
        let (mode, _) = self.open_with_fallback(folder).await?;
        Ok(mode)
    }

    /// Open `folder` and report its counters (message count, new
    /// message count, first unseen).
    ///
    /// # Errors
    ///
    /// Same as [`open_folder`](Self::open_folder).
    pub async fn folder_status(&mut self, folder: &Folder) -> Result<FolderStatus> {
        let (_, status) = self.open_with_fallback(folder).await?;
        Ok(status)
    }

    /// Close the session. Errors on the way out are ignored.
    pub async fn logout(self) {
        match self.backend {
            Backend::Imap(imap) => imap.logout().await,
            Backend::Pop3(pop3) => pop3.logout().await,
        }
    }

    // -- crate-internal operations used by extraction --

    pub(crate) async fn open_with_fallback(
        &mut self,
        folder: &Folder,
    ) -> Result<(FolderMode, FolderStatus)> {
        match self.open_mode(folder, FolderMode::ReadWrite).await {
            Ok(status) => Ok((FolderMode::ReadWrite, status)),
            Err(e) => {
                debug!("Read-write open of {} refused ({}), retrying read-only", folder, e);
                match self.open_mode(folder, FolderMode::ReadOnly).await {
                    Ok(status) => Ok((FolderMode::ReadOnly, status)),
                    Err(e) => {
                        error!("Cannot open folder {}: {}", folder, e);
                        Err(e)
                    }
                }
            }
        }
    }

    /// Open `folder` in exactly `mode`.
    pub(crate) async fn open_mode(
        &mut self,
        folder: &Folder,
        mode: FolderMode,
    ) -> Result<FolderStatus> {
        self.open = None;

        let status = match &mut self.backend {
            Backend::Imap(imap) => imap.open(folder, mode).await?,
            Backend::Pop3(pop3) => {
                if mode == FolderMode::ReadWrite {
                    return Err(unsupported(self.protocol, "read-write folders"));
                }
                pop3.open(folder).await?
            }
        };

        self.open = Some(OpenFolder {
            folder: folder.clone(),
            mode,
        });
        info!("Opened {} {} ({} messages)", folder, mode, status.exists);
        Ok(status)
    }

    pub(crate) async fn search(&mut self, term: &FlagTerm) -> Result<Vec<MessageRef>> {
        self.require_open()?;
        match &mut self.backend {
            Backend::Imap(imap) => imap.search(term).await,
            Backend::Pop3(_) => Err(unsupported(self.protocol, "flag search")),
        }
    }

    pub(crate) async fn all(&mut self) -> Result<Vec<MessageRef>> {
        self.require_open()?;
        match &mut self.backend {
            Backend::Imap(imap) => imap.all().await,
            Backend::Pop3(pop3) => pop3.all().await,
        }
    }

    pub(crate) async fn fetch_headers(&mut self, msg: MessageRef) -> Result<Vec<Header>> {
        self.require_open()?;
        let raw = match &mut self.backend {
            Backend::Imap(imap) => imap.fetch_header(msg).await?,
            Backend::Pop3(pop3) => pop3.fetch_header(msg).await?,
        };
        parse_headers(&raw)
    }

    pub(crate) async fn fetch_content(&mut self, msg: MessageRef) -> Result<Vec<u8>> {
        self.require_open()?;
        match &mut self.backend {
            Backend::Imap(imap) => imap.fetch_content(msg).await,
            Backend::Pop3(pop3) => pop3.fetch_content(msg).await,
        }
    }

    pub(crate) async fn add_flag(&mut self, msg: MessageRef, flag: &Flag) -> Result<()> {
        let open = self.require_open()?;
        if open.mode == FolderMode::ReadOnly {
            return Err(Error::ReadOnly(open.folder.to_string()));
        }
        match &mut self.backend {
            Backend::Imap(imap) => imap.add_flag(msg, flag).await,
            Backend::Pop3(_) => Err(unsupported(self.protocol, "message flags")),
        }
    }

    fn require_open(&self) -> Result<&OpenFolder> {
        self.open.as_ref().ok_or(Error::NoFolderOpen)
    }
}

const fn unsupported(protocol: Protocol, operation: &'static str) -> Error {
    Error::Unsupported {
        protocol,
        operation,
    }
}
