pub mod render;
pub mod smtp;
pub mod webhook;

use chrono::Utc;

pub use render::{escape_html, render_report, ReportEntry};
pub use smtp::{SmtpConfig, SmtpSender};
pub use webhook::WebhookSender;

pub const FALLBACK_RECIPIENT: &str = "default@example.com";

/// First explicit recipient, else the first configured one, else the fallback address.
pub fn resolve_recipient(recipients: &[String], default_recipients: &[String]) -> String {
    recipients
        .iter()
        .chain(default_recipients.iter())
        .map(|r| r.trim())
        .find(|r| !r.is_empty())
        .unwrap_or(FALLBACK_RECIPIENT)
        .to_string()
}

pub fn default_subject() -> String {
    format!("Media Report - {}", Utc::now().format("%Y-%m-%d %H:%M"))
}
