//! Mail store protocols
//!
//! The store protocol is chosen by the `mail.store.protocol` setting.
//! Names follow the JavaMail convention so existing configuration files
//! keep working: `imap`, `imaps`, `pop3`, `pop3s`.

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// A supported mail store protocol.
///
/// # Examples
///
/// ```
/// use mailbox_extract::Protocol;
///
/// let p: Protocol = "imaps".parse().unwrap();
/// assert_eq!(p, Protocol::Imaps);
/// assert_eq!(p.default_port(), 993);
/// assert!(p.is_imap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// IMAP on a plain connection, optionally upgraded with STARTTLS.
    Imap,
    /// IMAP over implicit TLS.
    Imaps,
    /// POP3 on a plain connection, optionally upgraded with STLS.
    Pop3,
    /// POP3 over implicit TLS.
    Pop3s,
}

impl Protocol {
    /// The protocol name as used in configuration keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Imap => "imap",
            Self::Imaps => "imaps",
            Self::Pop3 => "pop3",
            Self::Pop3s => "pop3s",
        }
    }

    /// Well-known port for the protocol.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Imap => 143,
            Self::Imaps => 993,
            Self::Pop3 => 110,
            Self::Pop3s => 995,
        }
    }

    /// Whether the connection is wrapped in TLS before the greeting.
    #[must_use]
    pub const fn implicit_tls(self) -> bool {
        matches!(self, Self::Imaps | Self::Pop3s)
    }

    #[must_use]
    pub const fn is_imap(self) -> bool {
        matches!(self, Self::Imap | Self::Imaps)
    }

    /// The protocol family name (`imap` or `pop3`).
    ///
    /// Host and user settings are shared by a family, so `imaps` reads
    /// `mail.imap.host` just like `imap` does.
    #[must_use]
    pub const fn family(self) -> &'static str {
        if self.is_imap() { "imap" } else { "pop3" }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "imap" => Ok(Self::Imap),
            "imaps" => Ok(Self::Imaps),
            "pop3" => Ok(Self::Pop3),
            "pop3s" => Ok(Self::Pop3s),
            other => Err(Error::NoSuchProvider(other.to_string())),
        }
    }
}
