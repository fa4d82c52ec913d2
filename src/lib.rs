//! Mailbox access helper
//!
//! Signs in to an IMAP or POP3 mail store described by a properties
//! file, picks a folder, and extracts messages as JSON-ready records.
//!
//! ```no_run
//! use mailbox_extract::{ConfigStore, sign_in_configured, to_json};
//!
//! # async fn run() -> mailbox_extract::Result<()> {
//! let config = ConfigStore::load("config.properties")?.snapshot();
//! let mut store = sign_in_configured(&config, "secret").await?;
//! let records = store.unread_records(&config.folder()).await?;
//! println!("{}", to_json(&records)?);
//! store.logout().await;
//! # Ok(())
//! # }
//! ```
//!
//! Messages are read with `BODY.PEEK`, so only unread extraction ever
//! changes a flag.

mod config;
mod error;
mod extract;
mod flag;
mod folder;
mod imap;
mod message;
mod pop3;
mod prompt;
mod protocol;
mod record;
mod store;
mod transport;

pub use config::{ConfigKey, ConfigStore, DEFAULT_CONFIG_FILE, MailConfig};
pub use error::{Error, Result};
pub use extract::Extraction;
pub use flag::{Flag, FlagTerm};
pub use folder::{Folder, FolderMode, FolderStatus, select_by_index, select_by_name};
pub use message::{Header, MessageRef, RawMessage, parse_headers};
pub use prompt::{prompt_folder_index, select_folder_interactive};
pub use protocol::Protocol;
pub use record::{CopyRecord, EmailRecord, RecordKind, to_json, to_json_pretty};
pub use store::{Store, sign_in, sign_in_configured};
pub use transport::{Endpoint, Security};
