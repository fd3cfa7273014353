use anyhow::Result;
use async_trait::async_trait;
use interfaces::defs::ReportSender;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};
use url::Url;

use crate::{default_subject, resolve_recipient};

pub const WEBHOOK_TIMEOUT_SECONDS: u64 = 30;

/// Envelope posted to the relay; the relay turns it into an email.
#[derive(Debug, Serialize)]
pub struct WebhookEnvelope<'a> {
    pub recipient: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
}

/// Sends reports through an HTTP webhook relay (for example an n8n workflow).
pub struct WebhookSender {
    client: Client,
    webhook_url: String,
    default_recipients: Vec<String>,
}

impl WebhookSender {
    pub fn new(webhook_url: &str, default_recipients: Vec<String>) -> Result<Self> {
        let parsed = Url::parse(webhook_url)
            .map_err(|e| anyhow::anyhow!("Invalid webhook URL '{}': {}", webhook_url, e))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(anyhow::anyhow!("Webhook URL must use http or https, got: {}", parsed.scheme()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            client,
            webhook_url: webhook_url.to_string(),
            default_recipients,
        })
    }

    async fn post(&self, envelope: &WebhookEnvelope<'_>) -> Result<StatusCode> {
        let response = self.client.post(&self.webhook_url).json(envelope).send().await?;
        Ok(response.status())
    }
}

#[async_trait]
impl ReportSender for WebhookSender {
    fn sender_name(&self) -> String {
        "webhook".to_string()
    }

    async fn send(&self, body: &str, recipients: &[String], subject: Option<&str>) -> bool {
        let recipient = resolve_recipient(recipients, &self.default_recipients);
        let subject = subject.map(str::to_string).unwrap_or_else(default_subject);
        let envelope = WebhookEnvelope {
            recipient: &recipient,
            subject: &subject,
            body,
        };

        match self.post(&envelope).await {
            Ok(StatusCode::OK) => {
                info!(recipient = %recipient, "Report delivered through webhook");
                true
            }
            Ok(status) => {
                error!(%status, "Webhook relay rejected report");
                false
            }
            Err(e) => {
                error!(error = %e, "Webhook relay unreachable");
                false
            }
        }
    }
}
