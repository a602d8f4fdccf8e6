//! Plain-text mail delivery over SMTP, for setups without an SNS topic.

use anyhow::{Context, Result};
use async_trait::async_trait;
use calsnap_core::{Config, Notification};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

use super::NotificationPublisher;

/// Sends each notification as one mail to a fixed recipient.
#[derive(Clone)]
pub struct SmtpPublisher {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpPublisher {
    /// Create the publisher from config (`SMTP_*` and `RECIPIENT_EMAIL`).
    pub fn from_config(config: &Config) -> Result<Self> {
        let host = config.smtp_host().context("SMTP_HOST not configured")?;
        let from = config.smtp_from().context("SMTP_FROM not configured")?;
        let to = config
            .recipient_email()
            .context("RECIPIENT_EMAIL not configured")?;
        let port = config.smtp_port();

        let credentials = match (config.smtp_user(), config.smtp_password()) {
            (Some(u), Some(p)) => Some(Credentials::new(u.to_string(), p.to_string())),
            _ => None,
        };

        let mailer = if config.smtp_tls() {
            let b = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .context("Invalid SMTP_HOST for STARTTLS relay")?
                .port(port);
            let b = match credentials {
                Some(c) => b.credentials(c),
                None => b,
            };
            tracing::info!(host = %host, port = port, "SMTP publisher initialized (STARTTLS)");
            b.build()
        } else {
            let b = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port);
            let b = match credentials {
                Some(c) => b.credentials(c),
                None => b,
            };
            tracing::info!(host = %host, port = port, "SMTP publisher initialized");
            b.build()
        };

        Self::new(mailer, from, to)
    }

    pub fn new(mailer: AsyncSmtpTransport<Tokio1Executor>, from: &str, to: &str) -> Result<Self> {
        let from: Mailbox = from.parse().context("Invalid SMTP_FROM address")?;
        let to: Mailbox = to.parse().context("Invalid RECIPIENT_EMAIL address")?;
        Ok(Self {
            mailer: Arc::new(mailer),
            from,
            to,
        })
    }

    fn build_message(&self, notification: &Notification) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(notification.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.message.clone())
            .context("Failed to build notification mail")
    }
}

#[async_trait]
impl NotificationPublisher for SmtpPublisher {
    async fn publish(&self, notification: &Notification) -> Result<()> {
        let email = self.build_message(notification)?;

        self.mailer
            .send(email)
            .await
            .context("Failed to send notification mail")?;

        tracing::info!(to = %self.to, "Notification mail sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publisher() -> SmtpPublisher {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous("localhost")
            .port(2525)
            .build();
        SmtpPublisher::new(mailer, "calsnap@example.com", "me@example.com").unwrap()
    }

    #[test]
    fn message_carries_subject_and_body() {
        let message = publisher()
            .build_message(&Notification::for_calories(350.0))
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: OCR Calories 350.0"));
        assert!(raw.contains("To: me@example.com"));
        assert!(raw.contains("Calories=350.0"));
    }

    #[test]
    fn invalid_recipient_is_rejected() {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous("localhost").build();
        assert!(SmtpPublisher::new(mailer, "calsnap@example.com", "not an address").is_err());
    }
}
