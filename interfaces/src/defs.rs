use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An article waiting for the next report run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingItem {
    pub id: i64,
    pub url: String,
    pub submitted_by: String,
    pub pasted_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An article that needs a human to paste its text before it can be summarized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManualItem {
    pub id: i64,
    pub url: String,
    pub submitted_by: String,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ManualItem {
    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchivedItem {
    pub id: i64,
    pub url: String,
    pub submitted_by: String,
    pub original_created_at: DateTime<Utc>,
    pub archived_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParliamentaryQuestionRecord {
    pub id: i64,
    pub text: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub source_item_ids: Vec<i64>,
}

/// Where an already-known URL currently lives.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateLocation {
    Pending,
    Manual,
    Archived,
}

impl std::fmt::Display for DuplicateLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateLocation::Pending => write!(f, "pending"),
            DuplicateLocation::Manual => write!(f, "manual"),
            DuplicateLocation::Archived => write!(f, "archived"),
        }
    }
}

/// Outcome of scraping one URL. Failures are carried in `error`, never raised.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    pub success: bool,
    pub title: Option<String>,
    pub text: Option<String>,
    pub authors: Vec<String>,
    pub publish_date: Option<String>,
    pub error: Option<String>,
}

impl ExtractionResult {
    pub fn succeeded(title: String, text: String, authors: Vec<String>, publish_date: Option<String>) -> Self {
        Self {
            success: true,
            title: Some(title),
            text: Some(text),
            authors,
            publish_date,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummaryKind {
    Media,
    Hansard,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SummaryResult {
    pub success: bool,
    pub summary: Option<String>,
    pub error: Option<String>,
    pub tokens_used: u32,
}

impl SummaryResult {
    pub fn succeeded(summary: String, tokens_used: u32) -> Self {
        Self {
            success: true,
            summary: Some(summary),
            error: None,
            tokens_used,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Phase of a report run as seen by a polling client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReportPhase {
    #[serde(rename = "pending")]
    Queued,
    #[serde(rename = "processing")]
    Running,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "failed")]
    Failed,
}

impl ReportPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportPhase::Completed | ReportPhase::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportRun {
    pub report_id: String,
    pub phase: ReportPhase,
    pub message: String,
    pub progress: u8,
    pub updated_at: DateTime<Utc>,
}

// Collaborator seams. Each one converts its own upstream failures into a
// result value so the caller can decide per item how to move forward.

/// Fetches a page and pulls the article title and text out of it.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Name used in log lines
    fn extractor_name(&self) -> String;

    /// Extract an article. Never fails; see `ExtractionResult::error`.
    async fn extract(&self, url: &str) -> ExtractionResult;
}

/// Produces a summary of the given text with a language model.
#[async_trait]
pub trait Summarizer: Send + Sync {
    fn summarizer_name(&self) -> String;

    /// `source_url` is only meaningful for `SummaryKind::Media`.
    async fn summarize(&self, text: &str, kind: SummaryKind, source_url: Option<&str>) -> SummaryResult;
}

/// Delivers a rendered HTML report.
#[async_trait]
pub trait ReportSender: Send + Sync {
    fn sender_name(&self) -> String;

    /// Returns true only when delivery was confirmed. Only the first recipient is used.
    async fn send(&self, body: &str, recipients: &[String], subject: Option<&str>) -> bool;
}
