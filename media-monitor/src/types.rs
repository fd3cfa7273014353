use serde::{Deserialize, Serialize};
// Shared records and collaborator seams live in the interfaces crate
pub use interfaces::defs::{ArchivedItem, ManualItem, ParliamentaryQuestionRecord, PendingItem};
pub use interfaces::defs::{ContentExtractor, ExtractionResult, ReportSender, SummaryKind, SummaryResult, Summarizer};
pub use interfaces::defs::{DuplicateLocation, ReportPhase, ReportRun};

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_redirects: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            user_agent: "Media Monitoring Agent/1.0".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_seconds: 1,
            max_redirects: 10,
        }
    }
}

/// How a submission was routed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Classification {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "manual_processing")]
    Manual,
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("URL already submitted ({location})")]
    Duplicate { location: DuplicateLocation },

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MonitorError {
    pub fn invalid(message: impl Into<String>) -> Self {
        MonitorError::InvalidInput(message.into())
    }

    pub fn not_found(what: &'static str, id: impl ToString) -> Self {
        MonitorError::NotFound { what, id: id.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
