use std::collections::VecDeque;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tokio::sync::Mutex;

use crate::configuration::EmailSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), anyhow::Error>;
}

pub struct SmtpEmailSender {
    sender: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailSender {
    /// STARTTLS relay when credentials are configured, plain SMTP otherwise
    /// (local relays such as MailHog).
    pub fn from_settings(settings: &EmailSettings, host: &str) -> Result<Self, anyhow::Error> {
        let sender: Mailbox = settings
            .sender
            .parse()
            .with_context(|| format!("Invalid sender address: {}", settings.sender))?;

        let transport = match (&settings.smtp_username, &settings.smtp_password) {
            (Some(username), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                    .context("Failed to create SMTP transport.")?
                    .credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
        }
        .port(settings.smtp_port)
        .timeout(Some(settings.timeout()))
        .build();

        Ok(Self { sender, transport })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    #[tracing::instrument(name = "Send email over SMTP", skip(self, message), fields(subject = %message.subject))]
    async fn send(&self, message: &EmailMessage) -> Result<(), anyhow::Error> {
        let email = Message::builder()
            .from(self.sender.clone())
            .to(message
                .to
                .parse()
                .with_context(|| format!("Invalid recipient address: {}", message.to))?)
            .subject(message.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                message.text.clone(),
                message.html.clone(),
            ))
            .context("Failed to build email.")?;

        self.transport
            .send(email)
            .await
            .context("SMTP server rejected the message.")?;
        Ok(())
    }
}

/// Most recent messages kept by the sandbox; older ones are dropped.
pub const SANDBOX_OUTBOX_LIMIT: usize = 64;

/// Development transport: logs each message and keeps the latest ones in
/// memory for inspection by tests. Refused in production by configuration
/// validation.
#[derive(Default)]
pub struct SandboxEmailSender {
    outbox: Mutex<VecDeque<EmailMessage>>,
}

impl SandboxEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.outbox.lock().await.iter().cloned().collect()
    }
}

#[async_trait]
impl EmailSender for SandboxEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), anyhow::Error> {
        tracing::info!(to = %message.to, subject = %message.subject, "Sandbox email captured");
        tracing::debug!(body = %message.text, "Sandbox email body");

        let mut outbox = self.outbox.lock().await;
        if outbox.len() == SANDBOX_OUTBOX_LIMIT {
            outbox.pop_front();
        }
        outbox.push_back(message.clone());
        Ok(())
    }
}
