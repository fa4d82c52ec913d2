//! IMAP store backend

use crate::error::{Error, Result};
use crate::flag::{Flag, FlagTerm};
use crate::folder::{Folder, FolderMode, FolderStatus};
use crate::message::MessageRef;
use crate::transport::{Endpoint, MailStream, Security};
use async_imap::Session;
use async_imap::types::Fetch;
use futures::{StreamExt, TryStreamExt};
use std::fmt;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info};

/// An IMAP session over a plain or TLS stream.
pub type ImapSession = Session<Compat<MailStream>>;

/// Part of a message to fetch. Both use `BODY.PEEK` so reading never
/// sets `\Seen` on its own.
#[derive(Debug, Clone, Copy)]
enum Section {
    Header,
    Text,
}

impl Section {
    const fn query(self) -> &'static str {
        match self {
            Self::Header => "(BODY.PEEK[HEADER])",
            Self::Text => "(BODY.PEEK[TEXT])",
        }
    }

    fn pick(self, fetch: &Fetch) -> Option<&[u8]> {
        match self {
            Self::Header => fetch.header(),
            Self::Text => fetch.text(),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Header => "header",
            Self::Text => "content",
        })
    }
}

/// An authenticated IMAP connection.
pub struct ImapStore {
    session: ImapSession,
}

impl ImapStore {
    /// Connect to `endpoint`, upgrade with STARTTLS when configured,
    /// and log in.
    pub async fn connect(endpoint: &Endpoint, user: &str, password: &str) -> Result<Self> {
        let stream = MailStream::connect(endpoint).await?;
        let mut client = async_imap::Client::new(stream.compat());

        // RFC 3501 Section 7.1.1: server greeting
        let _greeting = client.read_response().await;

        if endpoint.security == Security::StartTls {
            client
                .run_command_and_check_ok("STARTTLS", None)
                .await
                .map_err(|e| Error::Tls(format!("STARTTLS failed: {e}")))?;

            let plain = client.into_inner().into_inner();
            let tls = plain.upgrade_to_tls(endpoint).await?;
            client = async_imap::Client::new(tls.compat());
        }

        let session = client
            .login(user, password)
            .await
            .map_err(|(e, _)| Error::Auth(format!("Login failed: {e}")))?;

        info!("Connected to IMAP server {}", endpoint.address());
        Ok(Self { session })
    }

    /// List every folder under the root.
    pub async fn list_folders(&mut self) -> Result<Vec<Folder>> {
        let mut folder_stream = self
            .session
            .list(Some(""), Some("*"))
            .await
            .map_err(|e| Error::Imap(format!("List folders failed: {e}")))?;

        let mut folders = Vec::new();
        while let Some(item) = folder_stream.next().await {
            if let Ok(name) = item {
                folders.push(Folder::from(name.name()));
            }
        }
        drop(folder_stream);

        Ok(folders)
    }

    /// SELECT (read-write) or EXAMINE (read-only) a folder.
    pub async fn open(&mut self, folder: &Folder, mode: FolderMode) -> Result<FolderStatus> {
        let name = folder.as_str();
        let opened = match mode {
            FolderMode::ReadWrite => self.session.select(name).await,
            FolderMode::ReadOnly => self.session.examine(name).await,
        };

        let mailbox = opened.map_err(|e| match e {
            async_imap::error::Error::No(_) => Error::FolderNotFound(name.to_string()),
            other => Error::Imap(format!("Failed to open {name} {mode}: {other}")),
        })?;

        debug!("Opened {} {} ({} messages)", name, mode, mailbox.exists);
        Ok(FolderStatus {
            exists: mailbox.exists,
            recent: mailbox.recent,
            first_unseen: mailbox.unseen,
        })
    }

    /// UIDs matching `term`, ascending.
    pub async fn search(&mut self, term: &FlagTerm) -> Result<Vec<MessageRef>> {
        self.uid_search(term.to_search_query()).await
    }

    /// Every UID in the open folder, ascending.
    pub async fn all(&mut self) -> Result<Vec<MessageRef>> {
        self.uid_search("ALL").await
    }

    pub async fn fetch_header(&mut self, msg: MessageRef) -> Result<Vec<u8>> {
        self.fetch_section(msg, Section::Header).await
    }

    pub async fn fetch_content(&mut self, msg: MessageRef) -> Result<Vec<u8>> {
        self.fetch_section(msg, Section::Text).await
    }

    /// Add `flag` to a message (`STORE +FLAGS`).
    pub async fn add_flag(&mut self, msg: MessageRef, flag: &Flag) -> Result<()> {
        let query = flag.store_add();
        let responses: Vec<Fetch> = match msg {
            MessageRef::Uid(uid) => self
                .session
                .uid_store(uid.to_string(), &query)
                .await
                .map_err(|e| Error::Imap(format!("Store failed: {e}")))?
                .try_collect()
                .await
                .map_err(|e| Error::Imap(format!("Store error: {e}")))?,
            MessageRef::Seq(seq) => self
                .session
                .store(seq.to_string(), &query)
                .await
                .map_err(|e| Error::Imap(format!("Store failed: {e}")))?
                .try_collect()
                .await
                .map_err(|e| Error::Imap(format!("Store error: {e}")))?,
        };

        debug!("Set {} on {} ({} updates)", flag, msg, responses.len());
        Ok(())
    }

    pub async fn logout(mut self) {
        self.session.logout().await.ok();
    }

    // -- private helpers --

    async fn uid_search(&mut self, query: &str) -> Result<Vec<MessageRef>> {
        let uids = self
            .session
            .uid_search(query)
            .await
            .map_err(|e| Error::Imap(format!("Search failed: {e}")))?;

        let mut uid_list: Vec<u32> = uids.into_iter().collect();
        uid_list.sort_unstable();

        debug!("Found {} messages matching '{}'", uid_list.len(), query);
        Ok(uid_list.into_iter().map(MessageRef::Uid).collect())
    }

    async fn fetch_section(&mut self, msg: MessageRef, section: Section) -> Result<Vec<u8>> {
        let query = section.query();
        let fetches: Vec<Fetch> = match msg {
            MessageRef::Uid(uid) => self
                .session
                .uid_fetch(uid.to_string(), query)
                .await
                .map_err(|e| Error::Imap(format!("Fetch failed: {e}")))?
                .try_collect()
                .await
                .map_err(|e| Error::Imap(format!("Fetch error: {e}")))?,
            MessageRef::Seq(seq) => self
                .session
                .fetch(seq.to_string(), query)
                .await
                .map_err(|e| Error::Imap(format!("Fetch failed: {e}")))?
                .try_collect()
                .await
                .map_err(|e| Error::Imap(format!("Fetch error: {e}")))?,
        };

        fetches
            .iter()
            .find_map(|f| section.pick(f))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::Imap(format!("No {section} found for {msg}")))
    }
}
