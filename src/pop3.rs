//! POP3 store backend
//!
//! A thin command layer (RFC 1939, STLS from RFC 2595) over the shared
//! transport. POP3 has a single mailbox, exposed as `INBOX`, and no
//! message flags, so it can be read but never marked.

use crate::error::{Error, Result};
use crate::folder::{Folder, FolderStatus};
use crate::message::MessageRef;
use crate::transport::{Endpoint, MailStream, Security};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

/// An authenticated POP3 connection.
pub struct Pop3Store {
    stream: BufReader<MailStream>,
}

impl Pop3Store {
    /// Connect to `endpoint`, upgrade with STLS when configured, and
    /// authenticate with USER/PASS.
    pub async fn connect(endpoint: &Endpoint, user: &str, password: &str) -> Result<Self> {
        let stream = MailStream::connect(endpoint).await?;
        let mut store = Self {
            stream: BufReader::new(stream),
        };

        let greeting = store.read_status().await?;
        debug!("POP3 greeting: {}", greeting);

        if endpoint.security == Security::StartTls {
            store
                .command("STLS")
                .await
                .map_err(|e| Error::Tls(format!("STLS failed: {e}")))?;
            let plain = store.stream.into_inner();
            store = Self {
                stream: BufReader::new(plain.upgrade_to_tls(endpoint).await?),
            };
        }

        store
            .command(&format!("USER {user}"))
            .await
            .map_err(|e| Error::Auth(format!("USER rejected: {e}")))?;
        store
            .command(&format!("PASS {password}"))
            .await
            .map_err(|e| Error::Auth(format!("Login failed: {e}")))?;

        info!("Connected to POP3 server {}", endpoint.address());
        Ok(store)
    }

    /// POP3 has exactly one folder.
    #[must_use]
    pub fn list_folders(&self) -> Vec<Folder> {
        vec![Folder::Inbox]
    }

    /// Open the maildrop. Only `INBOX` exists.
    pub async fn open(&mut self, folder: &Folder) -> Result<FolderStatus> {
        if *folder != Folder::Inbox {
            return Err(Error::FolderNotFound(folder.to_string()));
        }

        let (count, size) = self.stat().await?;
        debug!("Maildrop has {} messages ({} octets)", count, size);
        Ok(FolderStatus {
            exists: count,
            recent: 0,
            first_unseen: None,
        })
    }

    /// Every message number in the maildrop, ascending.
    pub async fn all(&mut self) -> Result<Vec<MessageRef>> {
        let (count, _) = self.stat().await?;
        Ok((1..=count).map(MessageRef::Seq).collect())
    }

    /// The header block of a message (`TOP n 0`).
    pub async fn fetch_header(&mut self, msg: MessageRef) -> Result<Vec<u8>> {
        self.command(&format!("TOP {} 0", msg.number())).await?;
        self.read_multiline().await
    }

    /// The body of a message, without its header block (`RETR n`).
    pub async fn fetch_content(&mut self, msg: MessageRef) -> Result<Vec<u8>> {
        self.command(&format!("RETR {}", msg.number())).await?;
        let raw = self.read_multiline().await?;
        Ok(split_body(&raw).to_vec())
    }

    pub async fn logout(mut self) {
        self.command("QUIT").await.ok();
    }

    // -- private helpers --

    async fn stat(&mut self) -> Result<(u32, u64)> {
        let reply = self.command("STAT").await?;
        parse_stat(&reply)
    }

    /// Send one command line and return the text after `+OK`.
    async fn command(&mut self, line: &str) -> Result<String> {
        let verb = line.split_whitespace().next().unwrap_or_default();
        debug!("POP3 > {}", verb);

        let stream = self.stream.get_mut();
        stream.write_all(line.as_bytes()).await?;
        stream.write_all(b"\r\n").await?;
        stream.flush().await?;

        self.read_status().await
    }

    async fn read_status(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.stream.read_line(&mut line).await? == 0 {
            return Err(Error::Pop3("Connection closed by server".into()));
        }
        parse_status(&line)
    }

    /// Read a dot-terminated multi-line response, undoing
    /// byte-stuffing (RFC 1939 Section 3).
    async fn read_multiline(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        loop {
            let mut line = Vec::new();
            if self.stream.read_until(b'\n', &mut line).await? == 0 {
                return Err(Error::Pop3("Connection closed mid-response".into()));
            }
            if line == b".\r\n" || line == b".\n" {
                return Ok(data);
            }
            let unstuffed = if line.starts_with(b"..") {
                &line[1..]
            } else {
                &line[..]
            };
            data.extend_from_slice(unstuffed);
        }
    }
}

fn parse_status(line: &str) -> Result<String> {
    let line = line.trim_end();
    if let Some(rest) = line.strip_prefix("+OK") {
        Ok(rest.trim().to_string())
    } else if let Some(rest) = line.strip_prefix("-ERR") {
        Err(Error::Pop3(rest.trim().to_string()))
    } else {
        Err(Error::Pop3(format!("Unexpected response: {line}")))
    }
}

fn parse_stat(reply: &str) -> Result<(u32, u64)> {
    let mut parts = reply.split_whitespace();
    let count = parts.next().and_then(|n| n.parse().ok());
    let size = parts.next().and_then(|n| n.parse().ok());
    match (count, size) {
        (Some(count), Some(size)) => Ok((count, size)),
        _ => Err(Error::Pop3(format!("Malformed STAT reply: {reply}"))),
    }
}

/// The part of a raw message after the blank line that ends the
/// header block. A message with no blank line has an empty body.
fn split_body(raw: &[u8]) -> &[u8] {
    if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
        return &raw[pos + 4..];
    }
    if let Some(pos) = raw.windows(2).position(|w| w == b"\n\n") {
        return &raw[pos + 2..];
    }
    &[]
}
