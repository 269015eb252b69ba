use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::core::system_monitor::alerts::AlertEvent;
use crate::core::system_monitor::dispatcher::AlertHandler;
use crate::error::{MonitorError, Result};

/// SMTP account used to send alert mail.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub sender: String,
    pub password: String,
    pub recipients: Vec<String>,
    pub subject: String,
}

/// Sends each alert as a plain-text mail over STARTTLS.
pub struct EmailHandler {
    settings: SmtpSettings,
    from: Mailbox,
    to: Vec<Mailbox>,
    timeout: Duration,
}

impl EmailHandler {
    /// Validates the addresses up front so a typo fails at startup, not at the first alert.
    pub fn new(settings: SmtpSettings) -> Result<Self> {
        if settings.recipients.is_empty() {
            return Err(MonitorError::config("email handler needs at least one recipient"));
        }

        let from = parse_mailbox(&settings.sender)?;
        let to = settings
            .recipients
            .iter()
            .map(|r| parse_mailbox(r))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            settings,
            from,
            to,
            timeout: Duration::from_secs(10),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn message(&self, event: &AlertEvent) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(self.settings.subject.clone())
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }

        let body = format!(
            "{}\n\nSeverity: {}\nTime: {}\n",
            event.message,
            event.severity,
            event.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
        builder
            .body(body)
            .map_err(|e| MonitorError::email(format!("failed to build message: {}", e)))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse::<Mailbox>()
        .map_err(|e| MonitorError::config(format!("invalid email address '{}': {}", address, e)))
}

impl AlertHandler for EmailHandler {
    fn name(&self) -> &str {
        "email"
    }

    fn receive(&self, event: &AlertEvent) -> Result<()> {
        let message = self.message(event)?;

        let mailer = SmtpTransport::starttls_relay(&self.settings.server)
            .map_err(|e| MonitorError::handler("email", format!("smtp setup failed: {}", e)))?
            .port(self.settings.port)
            .credentials(Credentials::new(
                self.settings.sender.clone(),
                self.settings.password.clone(),
            ))
            .timeout(Some(self.timeout))
            .build();

        mailer
            .send(&message)
            .map_err(|e| MonitorError::handler("email", format!("send failed: {}", e)))?;
        log::debug!("Alert mailed to {} recipient(s)", self.to.len());
        Ok(())
    }
}
