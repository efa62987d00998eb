//! Outgoing mail delivery for search digests.
//!
//! [`MailTransport`] is the seam between digest composition and delivery.
//! [`SmtpTransport`] submits through a relay with `lettre`;
//! [`OutboxTransport`] writes each message as an RFC 5322 `.eml` file into
//! a pickup directory and is used when no relay is configured.

use crate::config::{MailConfig, SmtpConfig};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// A fully composed HTML email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

/// Delivers composed messages.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver `message` to all of its recipients.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Mail`] if the message could not be handed off.
    async fn send(&self, message: &OutgoingMessage) -> Result<()>;
}

/// Pick the transport for `config`: SMTP when a relay is configured,
/// otherwise the outbox directory.
///
/// # Errors
///
/// Returns [`AppError::Mail`] if the SMTP relay settings are unusable.
pub fn transport_for(config: &MailConfig) -> Result<Arc<dyn MailTransport>> {
    match &config.smtp {
        Some(smtp) => {
            tracing::info!(server = %smtp.server, port = smtp.port, "digests sent over SMTP");
            Ok(Arc::new(SmtpTransport::from_config(smtp)?))
        }
        None => {
            tracing::info!(dir = %config.outbox_dir.display(), "digests written to outbox");
            Ok(Arc::new(OutboxTransport::new(config.outbox_dir.clone())))
        }
    }
}

/// Submits messages to an SMTP relay.
#[derive(Clone)]
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    server: String,
}

impl SmtpTransport {
    /// # Errors
    ///
    /// Returns [`AppError::Mail`] if the TLS parameters for `config.server`
    /// cannot be built.
    pub fn from_config(config: &SmtpConfig) -> Result<Self> {
        let builder = if config.use_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)
        } else if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
        } else {
            Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
                &config.server,
            ))
        }
        .map_err(|e| AppError::Mail(format!("SMTP relay {}: {e}", config.server)))?;

        let mut builder = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_seconds)));
        if let Some(username) = &config.username {
            let password = config.password.clone().unwrap_or_default();
            builder = builder.credentials(Credentials::new(username.clone(), password));
        }

        Ok(Self {
            mailer: builder.build(),
            server: config.server.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<()> {
        let email = build_message(message)?;
        let response = self
            .mailer
            .send(email)
            .await
            .map_err(|e| AppError::Mail(format!("SMTP delivery via {}: {e}", self.server)))?;

        tracing::info!(
            recipients = message.to.len(),
            code = %response.code(),
            "digest submitted to SMTP relay"
        );
        Ok(())
    }
}

/// Convert to a `lettre` message with an HTML body.
///
/// # Errors
///
/// Returns [`AppError::Mail`] for an unparsable sender or recipient.
pub fn build_message(message: &OutgoingMessage) -> Result<lettre::Message> {
    let mut builder = lettre::Message::builder()
        .from(mailbox(&message.from)?)
        .subject(header_value(&message.subject))
        .header(ContentType::TEXT_HTML);
    for addr in &message.to {
        builder = builder.to(mailbox(addr)?);
    }
    builder
        .body(message.html_body.clone())
        .map_err(|e| AppError::Mail(format!("cannot build message: {e}")))
}

fn mailbox(addr: &str) -> Result<Mailbox> {
    addr.trim()
        .parse()
        .map_err(|e| AppError::Mail(format!("bad address {addr:?}: {e}")))
}

/// Writes messages as `.eml` files into a pickup directory.
#[derive(Debug, Clone)]
pub struct OutboxTransport {
    dir: PathBuf,
}

impl OutboxTransport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl MailTransport for OutboxTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<()> {
        let id = uuid::Uuid::new_v4();
        let content = render_eml(message, &id.to_string(), Utc::now());

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Mail(format!("cannot create outbox {}: {e}", self.dir.display())))?;

        // Write under a temporary name and rename so a pickup agent never
        // sees a partial file.
        let tmp = self.dir.join(format!(".{id}.tmp"));
        let path = self.dir.join(format!("{id}.eml"));
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| AppError::Mail(format!("cannot write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| AppError::Mail(format!("cannot finalise {}: {e}", path.display())))?;

        tracing::info!(
            recipients = message.to.len(),
            file = %path.display(),
            "digest queued in outbox"
        );
        Ok(())
    }
}

/// Render a message as RFC 5322 text with an HTML body.
pub fn render_eml(message: &OutgoingMessage, id: &str, date: DateTime<Utc>) -> String {
    let domain = message
        .from
        .rsplit_once('@')
        .map(|(_, d)| header_value(d))
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| "localhost".to_owned());
    let to = message
        .to
        .iter()
        .map(|addr| header_value(addr))
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = String::new();
    out.push_str(&format!("From: {}\r\n", header_value(&message.from)));
    out.push_str(&format!("To: {to}\r\n"));
    out.push_str(&format!("Subject: {}\r\n", header_value(&message.subject)));
    out.push_str(&format!("Date: {}\r\n", date.to_rfc2822()));
    out.push_str(&format!("Message-ID: <{id}@{domain}>\r\n"));
    out.push_str("MIME-Version: 1.0\r\n");
    out.push_str("Content-Type: text/html; charset=utf-8\r\n");
    out.push_str("Content-Transfer-Encoding: 8bit\r\n");
    out.push_str("\r\n");
    for line in message.html_body.lines() {
        out.push_str(line);
        out.push_str("\r\n");
    }
    out
}

/// Collapse CR/LF so user input cannot inject extra headers.
fn header_value(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn message() -> OutgoingMessage {
        OutgoingMessage {
            from: "digest@codequest.dev".into(),
            to: vec!["a@example.com".into(), "b@example.com".into()],
            subject: "Code Quest Search Results for \"rust\"".into(),
            html_body: "<h1>Results</h1>\n<p>none</p>".into(),
        }
    }

    #[test]
    fn eml_has_headers_and_body() {
        let date = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let eml = render_eml(&message(), "abc-123", date);
        assert!(eml.starts_with("From: digest@codequest.dev\r\n"));
        assert!(eml.contains("To: a@example.com, b@example.com\r\n"));
        assert!(eml.contains("Subject: Code Quest Search Results for \"rust\"\r\n"));
        assert!(eml.contains("Date: Tue, 14 Nov 2023 22:13:20 +0000\r\n"));
        assert!(eml.contains("Message-ID: <abc-123@codequest.dev>\r\n"));
        assert!(eml.contains("Content-Type: text/html; charset=utf-8\r\n"));
        assert!(eml.ends_with("\r\n<h1>Results</h1>\r\n<p>none</p>\r\n"));
    }

    #[test]
    fn header_injection_is_flattened() {
        let mut msg = message();
        msg.subject = "hi\r\nBcc: victim@example.com".into();
        let date = DateTime::from_timestamp(0, 0).unwrap();
        let eml = render_eml(&msg, "id", date);
        assert!(eml.contains("Subject: hi Bcc: victim@example.com\r\n"));
        assert!(!eml.contains("\r\nBcc:"));
    }

    #[test]
    fn lettre_message_carries_headers() {
        let email = build_message(&message()).unwrap();
        let text = String::from_utf8(email.formatted()).unwrap();
        assert!(text.contains("From: digest@codequest.dev\r\n"));
        assert!(text.contains("To: a@example.com, b@example.com\r\n"));
        assert!(text.contains("Content-Type: text/html; charset=utf-8\r\n"));
        assert_eq!(email.envelope().to().len(), 2);
    }

    #[test]
    fn unparsable_recipient_is_mail_error() {
        let mut msg = message();
        msg.to.push("not an address".into());
        assert!(matches!(build_message(&msg), Err(AppError::Mail(_))));
    }

    #[test]
    fn transport_selection_follows_config() {
        let mut config = MailConfig::default();
        assert!(transport_for(&config).is_ok());
        config.smtp = Some(SmtpConfig {
            server: "smtp.example.com".into(),
            username: Some("me@example.com".into()),
            password: Some("secret".into()),
            ..Default::default()
        });
        assert!(transport_for(&config).is_ok());
    }

    /// Minimal SMTP listener: answers every command with success and records
    /// the session transcript.
    async fn smtp_sink() -> (u16, tokio::task::JoinHandle<Vec<String>>) {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();
            let mut transcript = Vec::new();
            let mut in_data = false;

            write.write_all(b"220 sink ready\r\n").await.unwrap();
            while let Some(line) = lines.next_line().await.unwrap() {
                transcript.push(line.clone());
                let reply: &[u8] = if in_data {
                    if line != "." {
                        continue;
                    }
                    in_data = false;
                    b"250 queued\r\n"
                } else if line.starts_with("DATA") {
                    in_data = true;
                    b"354 go ahead\r\n"
                } else if line.starts_with("QUIT") {
                    write.write_all(b"221 bye\r\n").await.unwrap();
                    break;
                } else {
                    b"250 ok\r\n"
                };
                write.write_all(reply).await.unwrap();
            }
            transcript
        });
        (port, handle)
    }

    #[tokio::test]
    async fn smtp_transport_submits_to_relay() {
        let (port, sink) = smtp_sink().await;
        let transport = SmtpTransport::from_config(&SmtpConfig {
            server: "127.0.0.1".into(),
            port,
            use_tls: false,
            use_ssl: false,
            timeout_seconds: 5,
            ..Default::default()
        })
        .unwrap();

        transport.send(&message()).await.unwrap();
        drop(transport);

        let transcript = sink.await.unwrap();
        assert!(transcript.iter().any(|l| l.starts_with("EHLO")));
        assert!(transcript
            .iter()
            .any(|l| l.starts_with("MAIL FROM:<digest@codequest.dev>")));
        let rcpts = transcript.iter().filter(|l| l.starts_with("RCPT TO:")).count();
        assert_eq!(rcpts, 2);
        assert!(transcript.iter().any(|l| l.starts_with("Subject: Code Quest")));
    }

    #[tokio::test]
    async fn smtp_refused_connection_is_mail_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = SmtpTransport::from_config(&SmtpConfig {
            server: "127.0.0.1".into(),
            port,
            use_tls: false,
            use_ssl: false,
            timeout_seconds: 2,
            ..Default::default()
        })
        .unwrap();
        let err = transport.send(&message()).await.unwrap_err();
        assert!(matches!(err, AppError::Mail(_)));
    }

    #[tokio::test]
    async fn outbox_writes_one_file_per_message() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = OutboxTransport::new(dir.path().join("outbox"));

        outbox.send(&message()).await.unwrap();
        outbox.send(&message()).await.unwrap();

        let files: Vec<_> = std::fs::read_dir(outbox.dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 2);
        for file in files {
            assert_eq!(file.extension().and_then(|e| e.to_str()), Some("eml"));
            let content = std::fs::read_to_string(&file).unwrap();
            assert!(content.contains("To: a@example.com, b@example.com"));
        }
    }

    #[tokio::test]
    async fn unwritable_outbox_is_mail_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let outbox = OutboxTransport::new(blocker.join("outbox"));

        let err = outbox.send(&message()).await.unwrap_err();
        assert!(matches!(err, AppError::Mail(_)));
    }
}
