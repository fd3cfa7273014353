use anyhow::Result;
use async_trait::async_trait;
use interfaces::defs::ReportSender;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info};

use crate::{default_subject, resolve_recipient};

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
    pub from: String,
}

/// Sends reports as HTML mail straight to an SMTP relay.
pub struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    default_recipients: Vec<String>,
}

impl SmtpSender {
    pub fn new(config: &SmtpConfig, default_recipients: Vec<String>) -> Result<Self> {
        if config.host.is_empty() {
            return Err(anyhow::anyhow!("SMTP host is required for SMTP delivery"));
        }
        if config.from.is_empty() {
            return Err(anyhow::anyhow!("A sender address is required for SMTP delivery"));
        }

        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| anyhow::anyhow!("Invalid SMTP relay '{}': {}", config.host, e))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.from.clone(),
            default_recipients,
        })
    }

    fn build_message(&self, recipient: &str, subject: &str, body: &str) -> Result<Message> {
        let message = Message::builder()
            .from(self.from.parse()?)
            .to(recipient.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body.to_string())?;
        Ok(message)
    }
}

#[async_trait]
impl ReportSender for SmtpSender {
    fn sender_name(&self) -> String {
        "smtp".to_string()
    }

    async fn send(&self, body: &str, recipients: &[String], subject: Option<&str>) -> bool {
        let recipient = resolve_recipient(recipients, &self.default_recipients);
        let subject = subject.map(str::to_string).unwrap_or_else(default_subject);

        let message = match self.build_message(&recipient, &subject, body) {
            Ok(message) => message,
            Err(e) => {
                error!(error = %e, "Could not build report email");
                return false;
            }
        };

        match self.transport.send(message).await {
            Ok(_) => {
                info!(recipient = %recipient, "Report delivered over SMTP");
                true
            }
            Err(e) => {
                error!(error = %e, "SMTP delivery failed");
                false
            }
        }
    }
}
