//! Error types for mailbox-extract

use crate::protocol::Protocol;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IMAP error: {0}")]
    Imap(String),

    #[error("POP3 error: {0}")]
    Pop3(String),

    #[error("Message parsing error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No such provider: {0}")]
    NoSuchProvider(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("Folder index {index} out of range (valid: 1..{len})")]
    FolderIndexOutOfRange { index: usize, len: usize },

    #[error("No folder is open")]
    NoFolderOpen,

    #[error("Folder {0} is open read-only")]
    ReadOnly(String),

    #[error("{protocol} does not support {operation}")]
    Unsupported {
        protocol: Protocol,
        operation: &'static str,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
