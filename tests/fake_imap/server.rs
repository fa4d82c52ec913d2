//! In-process fake IMAP server for integration testing
//!
//! ## Connection lifecycle
//!
//! ```text
//!   Client connects via TCP
//!       |
//!   Server sends greeting: "* OK IMAP4rev1 ready\r\n"
//!       |
//!   Client sends STARTTLS, TLS handshake
//!       |
//!   Client sends LOGIN; wrong credentials get a tagged NO
//!       |
//!   Client issues commands: LIST, SELECT/EXAMINE, SEARCH, FETCH, STORE
//!       |
//!   Client sends LOGOUT
//! ```
//!
//! Every client command starts with a **tag** that the server echoes in
//! its completion response; lines prefixed with `*` are untagged data
//! sent before the tagged OK/NO/BAD:
//!
//! ```text
//!   Client:  A0002 LIST "" "*"
//!   Server:  * LIST (\HasNoChildren) "/" "INBOX"
//!   Server:  A0002 OK LIST completed
//! ```
//!
//! The mailbox lives behind a mutex shared by all connections, so a
//! test can sign in several times and check flags between sessions.

use super::handlers::{
    Access, Selected, StoreArgs, handle_fetch, handle_list, handle_login, handle_logout,
    handle_search, handle_select, handle_store,
};
use super::io::write_line;
use super::mailbox::Mailbox;
use imap_codec::CommandCodec;
use imap_codec::decode::Decoder;
use imap_codec::imap_types::command::CommandBody;
use imap_codec::imap_types::mailbox::Mailbox as ImapMailbox;
use rcgen::generate_simple_self_signed;
use rustls::pki_types::PrivatePkcs8KeyDer;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

/// A fake IMAP server on localhost with an OS-assigned port.
///
/// A self-signed certificate is generated at startup with `rcgen`, so
/// clients must be configured to trust any certificate.
pub struct FakeImapServer {
    port: u16,
    mailbox: Arc<Mutex<Mailbox>>,
    handle: tokio::task::JoinHandle<()>,
}

impl FakeImapServer {
    /// Start serving `mailbox`. The server stops when dropped.
    pub async fn start(mailbox: Mailbox) -> Self {
        // Several tests may race to install the provider; the loser's
        // error is harmless.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind to ephemeral port");
        let port = listener.local_addr().unwrap().port();

        let cert = generate_simple_self_signed(vec!["127.0.0.1".to_string()])
            .expect("generate self-signed cert");
        let cert_der = cert.cert.der().clone();
        let key_der = PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der());

        let tls_config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![cert_der], key_der.into())
            .expect("build server TLS config");

        let acceptor = TlsAcceptor::from(Arc::new(tls_config));
        let mailbox = Arc::new(Mutex::new(mailbox));
        let shared = mailbox.clone();

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _addr)) = listener.accept().await else {
                    break;
                };
                let acceptor = acceptor.clone();
                let mailbox = shared.clone();
                tokio::spawn(async move {
                    handle_connection(stream, acceptor, &mailbox).await;
                });
            }
        });

        Self {
            port,
            mailbox,
            handle,
        }
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    /// A copy of the current mailbox state.
    pub fn snapshot(&self) -> Mailbox {
        self.mailbox.lock().unwrap().clone()
    }
}

impl Drop for FakeImapServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Greeting, then STARTTLS, then the command loop over TLS.
async fn handle_connection(
    stream: tokio::net::TcpStream,
    acceptor: TlsAcceptor,
    mailbox: &Mutex<Mailbox>,
) {
    let mut reader = BufReader::new(stream);

    // RFC 3501 Section 7.1.1: Server greeting
    if write_line(&mut reader, "* OK IMAP4rev1 Fake server ready\r\n")
        .await
        .is_err()
    {
        return;
    }

    let mut line = String::new();
    if reader.read_line(&mut line).await.is_err() {
        return;
    }

    let Some((tag, command)) = line.trim().split_once(' ') else {
        return;
    };

    if !command.eq_ignore_ascii_case("STARTTLS") {
        let resp = format!("{tag} BAD Expected STARTTLS\r\n");
        let _ = write_line(&mut reader, &resp).await;
        return;
    }

    let resp = format!("{tag} OK Begin TLS negotiation now\r\n");
    if write_line(&mut reader, &resp).await.is_err() {
        return;
    }

    let tcp = reader.into_inner();
    let Ok(tls_stream) = acceptor.accept(tcp).await else {
        return;
    };

    handle_imap_session(tls_stream, mailbox).await;
}

fn mailbox_name(mb: &ImapMailbox<'_>) -> String {
    match mb {
        ImapMailbox::Inbox => "INBOX".to_string(),
        ImapMailbox::Other(other) => {
            let bytes: &[u8] = other.as_ref();
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Run the IMAP command loop over an established stream.
///
/// `imap-codec` parses each line into a typed command. LOGIN and FETCH
/// also look at the raw line, for the credentials and the requested
/// body section.
async fn handle_imap_session<S: AsyncRead + AsyncWrite + Unpin>(
    stream: S,
    mailbox: &Mutex<Mailbox>,
) {
    let mut reader = BufReader::new(stream);
    let mut authenticated = false;
    let mut selected: Option<Selected> = None;
    let codec = CommandCodec::default();

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Ok((_, command)) = codec.decode(line.as_bytes()) else {
            let tag = trimmed.split_whitespace().next().unwrap_or("*");
            let resp = format!("{tag} BAD Parse error\r\n");
            if write_line(&mut reader, &resp).await.is_err() {
                break;
            }
            continue;
        };

        let tag = command.tag.inner();
        let snap = mailbox.lock().unwrap().clone();

        match command.body {
            CommandBody::Login { .. } => {
                authenticated = handle_login(tag, trimmed, &snap, &mut reader).await;
            }
            CommandBody::Logout => {
                handle_logout(tag, &mut reader).await;
                break;
            }
            _ if !authenticated => {
                let resp = format!("{tag} BAD Not authenticated\r\n");
                if write_line(&mut reader, &resp).await.is_err() {
                    break;
                }
            }
            CommandBody::List { .. } => {
                handle_list(tag, &snap, &mut reader).await;
            }
            CommandBody::Select { mailbox: mb, .. } => {
                let name = mailbox_name(&mb);
                selected = handle_select(tag, &name, Access::ReadWrite, &snap, &mut reader).await;
            }
            CommandBody::Examine { mailbox: mb, .. } => {
                let name = mailbox_name(&mb);
                selected = handle_select(tag, &name, Access::ReadOnly, &snap, &mut reader).await;
            }
            CommandBody::Search { criteria, uid, .. } => {
                handle_search(
                    tag,
                    criteria.as_ref(),
                    uid,
                    &snap,
                    selected.as_ref().map(|s| s.name.as_str()),
                    &mut reader,
                )
                .await;
            }
            CommandBody::Fetch {
                ref sequence_set,
                uid,
                ..
            } => {
                handle_fetch(
                    tag,
                    trimmed,
                    sequence_set,
                    uid,
                    mailbox,
                    selected.as_ref(),
                    &mut reader,
                )
                .await;
            }
            CommandBody::Store {
                ref sequence_set,
                uid,
                ref kind,
                ref response,
                ref flags,
                ..
            } => {
                let args = StoreArgs {
                    sequence_set,
                    by_uid: uid,
                    kind,
                    response,
                    flags,
                };
                handle_store(tag, &args, mailbox, selected.as_ref(), &mut reader).await;
            }
            _ => {
                let resp = format!("{tag} BAD Unknown command\r\n");
                if write_line(&mut reader, &resp).await.is_err() {
                    break;
                }
            }
        }
    }
}
