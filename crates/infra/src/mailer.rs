//! Outgoing mail.
//!
//! Delivery is behind [`Mailer`]; the only implementation shipped here is an
//! in-process outbox that records messages instead of sending them.

use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport unavailable: {0}")]
    Unavailable(String),

    #[error("mail rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Records every message in memory.
#[derive(Debug, Default)]
pub struct InMemoryOutbox {
    sent: RwLock<Vec<OutgoingMail>>,
}

impl InMemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages in send order.
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.read().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// The most recent message addressed to `to` (case-insensitive).
    pub fn last_to(&self, to: &str) -> Option<OutgoingMail> {
        self.sent
            .read()
            .ok()?
            .iter()
            .rev()
            .find(|mail| mail.to.eq_ignore_ascii_case(to))
            .cloned()
    }
}

#[async_trait]
impl Mailer for InMemoryOutbox {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if mail.to.trim().is_empty() {
            return Err(MailError::Rejected("empty recipient".to_string()));
        }
        tracing::info!(to = %mail.to, subject = %mail.subject, "mail queued");
        self.sent
            .write()
            .map_err(|_| MailError::Unavailable("outbox lock poisoned".to_string()))?
            .push(mail);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(to: &str, subject: &str) -> OutgoingMail {
        OutgoingMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: String::new(),
        }
    }

    #[tokio::test]
    async fn last_to_returns_latest_for_recipient() {
        let outbox = InMemoryOutbox::new();
        outbox.send(mail("a@example.com", "first")).await.unwrap();
        outbox.send(mail("b@example.com", "other")).await.unwrap();
        outbox.send(mail("a@example.com", "second")).await.unwrap();

        assert_eq!(outbox.sent().len(), 3);
        assert_eq!(outbox.last_to("A@example.com").unwrap().subject, "second");
        assert!(outbox.last_to("c@example.com").is_none());
    }

    #[tokio::test]
    async fn empty_recipient_is_rejected() {
        let outbox = InMemoryOutbox::new();
        let err = outbox.send(mail(" ", "x")).await.unwrap_err();
        assert!(matches!(err, MailError::Rejected(_)));
        assert!(outbox.sent().is_empty());
    }
}
