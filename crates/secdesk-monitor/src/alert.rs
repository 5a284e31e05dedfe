//! Outbound alert email over SMTP

use anyhow::{Context, Result};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

/// SMTP settings for the alerter
#[derive(Clone)]
pub struct AlertConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    /// Sender address, e.g. "secdesk <alerts@example.org>"
    pub from: String,
    /// Recipient address
    pub to: String,
}

impl std::fmt::Debug for AlertConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

/// Sends alert emails through a relay
pub struct EmailAlerter {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailAlerter {
    pub fn new(config: &AlertConfig) -> Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .with_context(|| format!("Invalid alert sender address: {}", config.from))?;
        let to: Mailbox = config
            .to
            .parse()
            .with_context(|| format!("Invalid alert recipient address: {}", config.to))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .with_context(|| format!("Invalid SMTP relay host: {}", config.smtp_host))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { transport, from, to })
    }

    pub async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .body(body.to_string())
            .context("Failed to build alert email")?;

        self.transport
            .send(message)
            .await
            .context("Failed to send alert email")?;

        info!("Alert email sent to {}", self.to);
        Ok(())
    }
}
