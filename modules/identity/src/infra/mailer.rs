//! Mail adapters. Neither renders HTML; bodies are plain text.

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument};

use crate::domain::ports::MailerPort;

const WELCOME_SUBJECT: &str = "Welcome to Qure Healthcare!";
const RESET_SUBJECT: &str = "Reset Your Password - Qure Healthcare";

fn welcome_body(first_name: &str) -> String {
    format!(
        "Hello {first_name},\n\nYour Qure Healthcare account is ready. You can now book \
         appointments and join hospital queues from your dashboard.\n"
    )
}

fn reset_body(reset_link: &str) -> String {
    format!(
        "We received a request to reset your password.\n\nOpen this link to choose a new \
         password:\n{reset_link}\n\nThe link expires soon. If you did not request a reset, \
         ignore this email.\n"
    )
}

/// Writes mail to the log instead of sending it.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl MailerPort for LogMailer {
    async fn send_welcome(&self, to: &str, _first_name: &str) -> anyhow::Result<()> {
        info!(to, subject = WELCOME_SUBJECT, "mail not sent: no relay configured");
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, _reset_link: &str) -> anyhow::Result<()> {
        info!(to, subject = RESET_SUBJECT, "mail not sent: no relay configured");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: String,
}

/// POSTs each message as JSON to a mail relay.
pub struct HttpRelayMailer {
    client: reqwest::Client,
    endpoint: String,
    from: String,
}

impl HttpRelayMailer {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            from: from.into(),
        }
    }

    async fn post(&self, message: RelayMessage<'_>) -> anyhow::Result<()> {
        self.client
            .post(&self.endpoint)
            .json(&message)
            .send()
            .await
            .with_context(|| format!("POST {}", self.endpoint))?
            .error_for_status()
            .context("mail relay rejected message")?;
        Ok(())
    }
}

#[async_trait]
impl MailerPort for HttpRelayMailer {
    #[instrument(name = "identity.mail.welcome", skip_all, fields(endpoint = %self.endpoint))]
    async fn send_welcome(&self, to: &str, first_name: &str) -> anyhow::Result<()> {
        self.post(RelayMessage {
            from: &self.from,
            to,
            subject: WELCOME_SUBJECT,
            text: welcome_body(first_name),
        })
        .await
    }

    #[instrument(name = "identity.mail.password_reset", skip_all, fields(endpoint = %self.endpoint))]
    async fn send_password_reset(&self, to: &str, reset_link: &str) -> anyhow::Result<()> {
        self.post(RelayMessage {
            from: &self.from,
            to,
            subject: RESET_SUBJECT,
            text: reset_body(reset_link),
        })
        .await
    }
}
