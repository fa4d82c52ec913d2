//! LOGIN command handler.
//!
//! Credentials arrive as two quoted strings after the verb:
//!
//! ```text
//! A0001 LOGIN "testuser" "testpass"
//! ```
//!
//! They are compared against the mailbox account; a mismatch gets a
//! tagged NO and the session stays unauthenticated.

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Pull the user and password out of a raw LOGIN command line.
pub fn parse_credentials(line: &str) -> Option<(String, String)> {
    let mut rest = line.trim();
    for _ in 0..2 {
        // skip tag and verb
        let (_, tail) = rest.split_once(' ')?;
        rest = tail.trim_start();
    }
    let (user, tail) = take_astring(rest)?;
    let (password, _) = take_astring(tail.trim_start())?;
    Some((user, password))
}

/// Read one quoted or atom string, returning it and the remainder.
fn take_astring(input: &str) -> Option<(String, &str)> {
    if let Some(quoted) = input.strip_prefix('"') {
        let mut value = String::new();
        let mut chars = quoted.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => value.push(chars.next()?.1),
                '"' => return Some((value, &quoted[i + 1..])),
                other => value.push(other),
            }
        }
        None
    } else {
        let end = input.find(' ').unwrap_or(input.len());
        (end > 0).then(|| (input[..end].to_string(), &input[end..]))
    }
}

/// Handle the LOGIN command. Returns whether the client is now
/// authenticated.
pub async fn handle_login<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    line: &str,
    mailbox: &Mailbox,
    stream: &mut BufReader<S>,
) -> bool {
    let accepted = parse_credentials(line)
        .is_some_and(|(user, password)| user == mailbox.user && password == mailbox.password);

    let resp = if accepted {
        format!("{tag} OK LOGIN completed\r\n")
    } else {
        format!("{tag} NO [AUTHENTICATIONFAILED] Invalid credentials\r\n")
    };
    write_line(stream, &resp).await.is_ok() && accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use tokio::io::BufReader;

    async fn run(tag: &str, line: &str) -> (String, bool) {
        let mailbox = MailboxBuilder::new().build();
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);

        let ok = handle_login(tag, line, &mailbox, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        (String::from_utf8(buf).unwrap(), ok)
    }

    #[test]
    fn parses_quoted_credentials() {
        assert_eq!(
            parse_credentials("A1 LOGIN \"bob\" \"p\\\"w d\"\r\n"),
            Some(("bob".to_string(), "p\"w d".to_string()))
        );
    }

    #[test]
    fn parses_atom_credentials() {
        assert_eq!(
            parse_credentials("A1 LOGIN bob secret"),
            Some(("bob".to_string(), "secret".to_string()))
        );
    }

    #[tokio::test]
    async fn accepts_matching_credentials() {
        let (output, ok) = run("A0001", "A0001 LOGIN \"testuser\" \"testpass\"").await;
        assert!(ok);
        assert_eq!(output, "A0001 OK LOGIN completed\r\n");
    }

    #[tokio::test]
    async fn rejects_wrong_password() {
        let (output, ok) = run("TAG42", "TAG42 LOGIN \"testuser\" \"nope\"").await;
        assert!(!ok);
        assert!(output.starts_with("TAG42 NO "));
    }
}
