//! Message extraction
//!
//! Every extraction opens its folder in the mode it needs, collects
//! [`RawMessage`]s in server order, and isolates failures on a single
//! message from the rest of the batch:
//!
//! - a message whose headers cannot be read is skipped (and, for
//!   [`Extraction::Unread`], left unseen);
//! - a message whose content cannot be read is kept with no content.
//!
//! Unread extraction marks a message `\Seen` only after it has been
//! added to the output.

use crate::error::{Error, Result};
use crate::flag::{Flag, FlagTerm};
use crate::folder::{Folder, FolderMode};
use crate::message::{Header, MessageRef, RawMessage};
use crate::record::{CopyRecord, EmailRecord, body_text};
use crate::store::Store;
use std::fmt;
use tracing::{error, info, warn};

/// Which messages to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extraction {
    /// Unseen messages; each one is marked seen once extracted.
    Unread,
    /// Unseen messages, leaving their flags untouched.
    PeekUnread,
    /// Every message, leaving flags untouched.
    All,
}

impl Extraction {
    /// The folder mode this extraction needs.
    #[must_use]
    pub const fn mode(self) -> FolderMode {
        match self {
            Self::Unread => FolderMode::ReadWrite,
            Self::PeekUnread | Self::All => FolderMode::ReadOnly,
        }
    }

    const fn marks_seen(self) -> bool {
        matches!(self, Self::Unread)
    }

    const fn needs_flags(self) -> bool {
        matches!(self, Self::Unread | Self::PeekUnread)
    }
}

impl fmt::Display for Extraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unread => "unread",
            Self::PeekUnread => "unread (peek)",
            Self::All => "all",
        })
    }
}

impl Store {
    /// Extract messages from `folder`.
    ///
    /// An empty vector means the folder had nothing to extract; any
    /// failure to open or search the folder is an `Err`.
    ///
    /// POP3 keeps no `\Seen` state on the server, so [`Extraction::Unread`]
    /// and [`Extraction::PeekUnread`] are refused there instead of treating
    /// every message as unread. Use [`Extraction::All`] to read a POP3
    /// mailbox.
    ///
    /// # Errors
    ///
    /// - [`Error::FolderNotFound`] if the folder cannot be opened.
    /// - [`Error::ReadOnly`] if [`Extraction::Unread`] only gets
    ///   read-only access.
    /// - [`Error::Unsupported`] for flag-based extraction on POP3.
    /// - [`Error::Imap`] / [`Error::Pop3`] if the search fails.
    pub async fn extract(
        &mut self,
        folder: &Folder,
        extraction: Extraction,
    ) -> Result<Vec<RawMessage>> {
        if extraction.needs_flags() && !self.protocol().is_imap() {
            let e = Error::Unsupported {
                protocol: self.protocol(),
                operation: "unread extraction",
            };
            error!("Cannot extract {} messages: {}", extraction, e);
            return Err(e);
        }

        self.open_for(folder, extraction.mode()).await?;

        let found = if extraction.needs_flags() {
            self.search(&FlagTerm::unset(Flag::Seen)).await
        } else {
            self.all().await
        };
        let references =
            found.inspect_err(|e| error!("Search in {} failed: {}", folder, e))?;

        info!(
            "Extracting {} {} messages from {}",
            references.len(),
            extraction,
            folder
        );

        let mut messages = Vec::with_capacity(references.len());
        for reference in references {
            let headers = match self.fetch_headers(reference).await {
                Ok(headers) => headers,
                Err(e) => {
                    warn!("Skipping {}: cannot read headers: {}", reference, e);
                    continue;
                }
            };

            let content = match self.fetch_content(reference).await {
                Ok(content) => Some(content),
                Err(e) => {
                    warn!("Cannot read content of {}: {}", reference, e);
                    None
                }
            };

            messages.push(RawMessage {
                reference,
                headers,
                content,
            });

            if extraction.marks_seen() {
                if let Err(e) = self.add_flag(reference, &Flag::Seen).await {
                    warn!("Failed to mark {} as seen: {}", reference, e);
                }
            }
        }

        Ok(messages)
    }

    /// Extract unseen messages from `folder` as records, marking each
    /// one seen.
    ///
    /// # Errors
    ///
    /// See [`extract`](Self::extract).
    pub async fn unread_records(&mut self, folder: &Folder) -> Result<Vec<EmailRecord>> {
        let messages = self.extract(folder, Extraction::Unread).await?;
        Ok(messages.into_iter().map(RawMessage::into_record).collect())
    }

    /// Read unseen messages from `folder` without marking them.
    ///
    /// # Errors
    ///
    /// See [`extract`](Self::extract).
    pub async fn peek_unread(&mut self, folder: &Folder) -> Result<Vec<RawMessage>> {
        self.extract(folder, Extraction::PeekUnread).await
    }

    /// Read every message in `folder` without changing any flag.
    ///
    /// # Errors
    ///
    /// See [`extract`](Self::extract).
    pub async fn all_messages(&mut self, folder: &Folder) -> Result<Vec<RawMessage>> {
        self.extract(folder, Extraction::All).await
    }

    /// [`all_messages`](Self::all_messages) shaped as records.
    ///
    /// # Errors
    ///
    /// See [`extract`](Self::extract).
    pub async fn all_records(&mut self, folder: &Folder) -> Result<Vec<EmailRecord>> {
        let messages = self.extract(folder, Extraction::All).await?;
        Ok(messages.into_iter().map(RawMessage::into_record).collect())
    }

    /// Copy subject and body of every message in `folder`, walking
    /// message numbers `1..=count` in order.
    ///
    /// The folder is opened read-write when possible and read-only
    /// otherwise; no flag is changed. A message whose subject cannot be
    /// read gets an empty subject, and one whose body cannot be read
    /// gets no body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FolderNotFound`] if the folder cannot be opened.
    pub async fn copy_records(&mut self, folder: &Folder) -> Result<Vec<CopyRecord>> {
        let (_, status) = self.open_with_fallback(folder).await?;

        let mut records = Vec::new();
        for seq in 1..=status.exists {
            let reference = MessageRef::Seq(seq);

            let subject = match self.fetch_headers(reference).await {
                Ok(headers) => subject_of(&headers),
                Err(e) => {
                    warn!("Cannot read subject of {}: {}", reference, e);
                    String::new()
                }
            };

            let body = match self.fetch_content(reference).await {
                Ok(body) => Some(body_text(body)),
                Err(e) => {
                    warn!("Cannot read body of {}: {}", reference, e);
                    None
                }
            };

            records.push(CopyRecord { subject, body });
        }

        info!("Copied {} messages from {}", records.len(), folder);
        Ok(records)
    }

    /// [`copy_records`](Self::copy_records) on `INBOX`.
    ///
    /// # Errors
    ///
    /// See [`copy_records`](Self::copy_records).
    pub async fn copy_inbox_records(&mut self) -> Result<Vec<CopyRecord>> {
        self.copy_records(&Folder::Inbox).await
    }

    async fn open_for(&mut self, folder: &Folder, mode: FolderMode) -> Result<()> {
        match mode {
            FolderMode::ReadOnly => {
                self.open_mode(folder, FolderMode::ReadOnly)
                    .await
                    .inspect_err(|e| error!("Cannot open folder {}: {}", folder, e))?;
            }
            FolderMode::ReadWrite => {
                let (granted, _) = self.open_with_fallback(folder).await?;
                if granted == FolderMode::ReadOnly {
                    let e = Error::ReadOnly(folder.to_string());
                    error!("Cannot mark messages in {}: {}", folder, e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

fn subject_of(headers: &[Header]) -> String {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case("Subject"))
        .map(|h| h.value.clone())
        .unwrap_or_default()
}
