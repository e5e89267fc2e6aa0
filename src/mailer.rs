//! Mail transport: an opaque per-recipient delivery capability.
//!
//! Delivery reporting is all-or-nothing per submission: every configured
//! recipient gets an attempt, and one failure fails the whole operation.
//! No retries, no queueing.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::warn;

use crate::email::EmailPayload;

#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Hand one composed email to one recipient. Returns whether the
    /// transport accepted it.
    async fn deliver(&self, recipient: &str, payload: &EmailPayload) -> bool;
}

/// Attempt delivery to every recipient; true only if all succeeded.
pub async fn deliver_all(
    transport: &dyn MailTransport,
    recipients: &[String],
    payload: &EmailPayload,
) -> bool {
    let mut all_sent = true;
    for recipient in recipients {
        if !transport.deliver(recipient, payload).await {
            warn!("delivery to {} failed", recipient);
            all_sent = false;
        }
    }
    all_sent
}

// ==================== Sendmail ====================

/// Pipes the composed message to the local sendmail binary, which is what
/// the hosting environment provides for outbound mail.
pub struct SendmailTransport {
    path: PathBuf,
}

impl SendmailTransport {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn compose(recipient: &str, payload: &EmailPayload) -> String {
        let mut lines: Vec<String> = payload
            .headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect();
        lines.push(format!("To: {recipient}"));
        lines.push(format!("Subject: {}", payload.subject));
        lines.push(String::new());
        lines.push(payload.html_body.clone());
        lines.join("\r\n")
    }
}

#[async_trait]
impl MailTransport for SendmailTransport {
    async fn deliver(&self, recipient: &str, payload: &EmailPayload) -> bool {
        let message = Self::compose(recipient, payload);

        let mut child = match Command::new(&self.path)
            .arg("-t")
            .arg("-i")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!("failed to spawn {}: {}", self.path.display(), e);
                return false;
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(message.as_bytes()).await {
                warn!("failed to write message to sendmail: {}", e);
                return false;
            }
            // Closing stdin lets sendmail read EOF and start delivery.
            drop(stdin);
        }

        match child.wait().await {
            Ok(status) => status.success(),
            Err(e) => {
                warn!("failed to wait for sendmail: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FlakyTransport {
        failing: Vec<String>,
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MailTransport for FlakyTransport {
        async fn deliver(&self, recipient: &str, _payload: &EmailPayload) -> bool {
            self.delivered.lock().unwrap().push(recipient.to_string());
            !self.failing.contains(&recipient.to_string())
        }
    }

    fn payload() -> EmailPayload {
        EmailPayload {
            subject: "Обратная связь с сайта Ретрознак - Анна".to_string(),
            html_body: "<html></html>".to_string(),
            headers: vec![("Reply-To".to_string(), "anna@example.com".to_string())],
        }
    }

    #[tokio::test]
    async fn all_recipients_are_attempted_even_after_a_failure() {
        let transport = FlakyTransport {
            failing: vec!["admin@retroznak.ru".to_string()],
            delivered: Mutex::new(Vec::new()),
        };
        let recipients = vec![
            "admin@retroznak.ru".to_string(),
            "info@retroznak.ru".to_string(),
        ];
        assert!(!deliver_all(&transport, &recipients, &payload()).await);
        assert_eq!(transport.delivered.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delivery_succeeds_when_every_recipient_accepts() {
        let transport = FlakyTransport {
            failing: Vec::new(),
            delivered: Mutex::new(Vec::new()),
        };
        let recipients = vec!["info@retroznak.ru".to_string()];
        assert!(deliver_all(&transport, &recipients, &payload()).await);
    }

    #[test]
    fn composed_message_separates_headers_from_body() {
        let message = SendmailTransport::compose("info@retroznak.ru", &payload());
        assert!(message.starts_with("Reply-To: anna@example.com\r\n"));
        assert!(message.contains("To: info@retroznak.ru\r\n"));
        assert!(message.contains("\r\n\r\n<html></html>"));
    }
}
