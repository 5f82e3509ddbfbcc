//! Mail transport that writes messages to the log
//!
//! SMTP delivery is not part of this service; deployments that need it
//! provide their own `MailSender`.

use async_trait::async_trait;
use tracing::info;

use core_kernel::{DomainPort, PortError};
use domain_claims::{MailMessage, MailSender};

#[derive(Debug, Clone)]
pub struct LogMailSender {
    from: String,
}

impl LogMailSender {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }

    pub fn from_address(&self) -> &str {
        &self.from
    }
}

impl DomainPort for LogMailSender {}

#[async_trait]
impl MailSender for LogMailSender {
    async fn send(&self, message: &MailMessage) -> Result<(), PortError> {
        if message.to.is_empty() {
            return Err(PortError::validation("mail has no recipients"));
        }
        info!(
            from = %self.from,
            to = ?message.to,
            subject = %message.subject,
            body_len = message.html_body.len(),
            "mail sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refuses_mail_without_recipients() {
        let sender = LogMailSender::new("claims@example.com");
        let message = MailMessage {
            to: Vec::new(),
            subject: "hello".to_string(),
            html_body: String::new(),
        };
        assert!(sender.send(&message).await.is_err());

        let addressed = MailMessage {
            to: vec!["ana@example.com".to_string()],
            ..message
        };
        assert!(sender.send(&addressed).await.is_ok());
        assert_eq!(sender.from_address(), "claims@example.com");
    }
}
