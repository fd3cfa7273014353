//! Report runs: drive pending articles through extraction, summarization,
//! delivery and archival.
//!
//! Media runs demote articles that fail extraction to the manual queue as
//! soon as the failure is seen, and archive articles only after the report
//! that contains their summary has been delivered. Hansard runs never move
//! articles.

use crate::status::StatusTracker;
use crate::store::Store;
use crate::summarizer::{batch_summarize, BatchInput, BATCH_DELAY};
use crate::types::{
    ContentExtractor, MonitorError, ParliamentaryQuestionRecord, ReportPhase, ReportSender, Result, SummaryKind,
    Summarizer,
};
use chrono::Utc;
use report_delivery::{render_report, ReportEntry};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

pub const HANSARD_CATEGORY: &str = "Media-based Questions";
pub const HANSARD_SEPARATOR: &str = "\n\n---\n\n";
pub const DEFAULT_RECENT_QUESTIONS: u32 = 10;
pub const MAX_RECENT_QUESTIONS: u32 = 100;
const PREVIEW_CHARS: usize = 500;

/// Final result of a report run, also reflected in the status tracker.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunOutcome {
    pub report_id: String,
    pub success: bool,
    pub message: String,
    pub items_processed: usize,
    pub extraction_failures: usize,
    pub summary_failures: usize,
    pub delivered: bool,
}

impl RunOutcome {
    fn failed(report_id: &str, message: impl Into<String>) -> Self {
        Self {
            report_id: report_id.to_string(),
            success: false,
            message: message.into(),
            items_processed: 0,
            extraction_failures: 0,
            summary_failures: 0,
            delivered: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExtractedPreview {
    pub title: String,
    pub content: String,
    pub authors: Vec<String>,
    pub publish_date: Option<String>,
    pub word_count: usize,
}

/// Result of processing a single pending article without changing its state.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItemPreview {
    pub article_id: i64,
    pub url: String,
    pub submitted_by: String,
    pub success: bool,
    pub error: Option<String>,
    pub extraction: Option<ExtractedPreview>,
    pub summary: Option<String>,
    pub processing_time_ms: u64,
}

/// An item ready for summarization plus what the report needs to attribute it.
struct StagedUnit {
    pending_id: Option<i64>,
    title: String,
    url: Option<String>,
    submitted_by: String,
    input: BatchInput,
}

pub fn content_unit(title: &str, url: &str, text: &str) -> String {
    format!("Title: {}\nURL: {}\nContent: {}", title, url, text)
}

pub fn new_report_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Utc::now().format("%Y%m%d_%H%M%S_%6f"))
}

fn dated(prefix: &str) -> String {
    format!("{} - {}", prefix, Utc::now().format("%Y-%m-%d"))
}

pub struct ReportService {
    store: Arc<Store>,
    extractor: Arc<dyn ContentExtractor>,
    summarizer: Arc<dyn Summarizer>,
    sender: Arc<dyn ReportSender>,
    status: StatusTracker,
    batch_delay: Duration,
}

impl ReportService {
    pub fn new(
        store: Arc<Store>,
        extractor: Arc<dyn ContentExtractor>,
        summarizer: Arc<dyn Summarizer>,
        sender: Arc<dyn ReportSender>,
        status: StatusTracker,
    ) -> Self {
        Self {
            store,
            extractor,
            summarizer,
            sender,
            status,
            batch_delay: BATCH_DELAY,
        }
    }

    /// Pause between consecutive summarization calls in a batch.
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    pub fn status(&self) -> &StatusTracker {
        &self.status
    }

    // ============ background entry points ============

    /// Queue a media report and run it in the background. Returns the report id immediately.
    pub async fn start_media_report(self: &Arc<Self>, pasted_content: Option<String>, recipient: Option<String>) -> String {
        let report_id = new_report_id("media_report");
        self.status
            .set(&report_id, ReportPhase::Queued, "Report generation queued", 0)
            .await;

        let service = Arc::clone(self);
        let id = report_id.clone();
        self.spawn_run(report_id.clone(), async move {
            service.run_media_report(&id, pasted_content, recipient).await;
        });
        report_id
    }

    /// Queue a Hansard report and run it in the background. Returns the report id immediately.
    pub async fn start_hansard_report(self: &Arc<Self>, recipient: Option<String>) -> String {
        let report_id = new_report_id("hansard_report");
        self.status
            .set(&report_id, ReportPhase::Queued, "Report generation queued", 0)
            .await;

        let service = Arc::clone(self);
        let id = report_id.clone();
        self.spawn_run(report_id.clone(), async move {
            service.run_hansard_report(&id, recipient).await;
        });
        report_id
    }

    /// Run a report in its own task. A panic inside the run marks the report as failed.
    fn spawn_run<F>(&self, report_id: String, run: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let status = self.status.clone();
        let handle = tokio::spawn(run);
        tokio::spawn(async move {
            if let Err(e) = handle.await {
                error!(report_id = %report_id, error = %e, "Report task terminated abnormally");
                status
                    .set(&report_id, ReportPhase::Failed, format!("Report generation failed: {}", e), 0)
                    .await;
            }
        });
    }

    async fn finish(&self, outcome: Result<RunOutcome>, report_id: &str) -> RunOutcome {
        let outcome = outcome.unwrap_or_else(|e| {
            error!(report_id, error = %e, "Report run aborted");
            RunOutcome::failed(report_id, format!("Report generation failed: {}", e))
        });
        let (phase, progress) = if outcome.success {
            (ReportPhase::Completed, 100)
        } else {
            (ReportPhase::Failed, 0)
        };
        self.status.set(report_id, phase, outcome.message.clone(), progress).await;
        info!(report_id, success = outcome.success, "{}", outcome.message);
        outcome
    }

    // ============ media report ============

    pub async fn run_media_report(&self, report_id: &str, pasted_content: Option<String>, recipient: Option<String>) -> RunOutcome {
        let outcome = self.media_pipeline(report_id, pasted_content, recipient).await;
        self.finish(outcome, report_id).await
    }

    async fn media_pipeline(&self, report_id: &str, pasted_content: Option<String>, recipient: Option<String>) -> Result<RunOutcome> {
        let pending = self.store.list_pending().await?;
        let pasted = pasted_content.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
        if pending.is_empty() && pasted.is_none() {
            return Ok(RunOutcome::failed(report_id, "No pending articles or pasted content to process"));
        }

        self.status
            .set(report_id, ReportPhase::Running, "Starting media report generation", 10)
            .await;
        info!(report_id, pending = pending.len(), pasted = pasted.is_some(), "Starting media report");
        self.status
            .set(report_id, ReportPhase::Running, "Scraping articles and processing content", 50)
            .await;

        let mut units = Vec::new();
        let mut extraction_failures = 0;
        for item in &pending {
            let result = self.extractor.extract(&item.url).await;
            if result.success {
                let title = result.title.filter(|t| !t.is_empty()).unwrap_or_else(|| item.url.clone());
                let text = result.text.unwrap_or_default();
                units.push(StagedUnit {
                    pending_id: Some(item.id),
                    input: BatchInput {
                        text: content_unit(&title, &item.url, &text),
                        source_url: Some(item.url.clone()),
                    },
                    title,
                    url: Some(item.url.clone()),
                    submitted_by: item.submitted_by.clone(),
                });
            } else {
                extraction_failures += 1;
                warn!(
                    report_id,
                    url = %item.url,
                    error = result.error.as_deref().unwrap_or("unknown"),
                    "Extraction failed, moving article to manual processing"
                );
                // Committed now and kept even if the run fails later.
                self.store.demote_pending(item.id).await?;
            }
        }

        if let Some(text) = pasted {
            units.push(StagedUnit {
                pending_id: None,
                title: "Pasted Content Summary".to_string(),
                url: None,
                submitted_by: "Manual Entry".to_string(),
                input: BatchInput {
                    text: format!("Pasted Content:\n{}", text),
                    source_url: None,
                },
            });
        }

        if units.is_empty() {
            let mut outcome = RunOutcome::failed(report_id, "No content available for processing after scraping");
            outcome.extraction_failures = extraction_failures;
            return Ok(outcome);
        }

        let inputs: Vec<BatchInput> = units.iter().map(|u| u.input.clone()).collect();
        let batch = batch_summarize(self.summarizer.as_ref(), &inputs, SummaryKind::Media, self.batch_delay).await;

        let mut entries = Vec::new();
        let mut delivered_ids = Vec::new();
        let mut summary_failures = 0;
        for (unit, result) in units.into_iter().zip(batch.results) {
            match result.summary.filter(|_| result.success) {
                Some(summary) => {
                    if let Some(id) = unit.pending_id {
                        delivered_ids.push(id);
                    }
                    entries.push(ReportEntry::new(unit.title, summary, unit.url, unit.submitted_by));
                }
                None => {
                    summary_failures += 1;
                    warn!(
                        report_id,
                        title = %unit.title,
                        error = result.error.as_deref().unwrap_or("unknown"),
                        "Summarization failed"
                    );
                }
            }
        }

        let mut outcome = RunOutcome {
            report_id: report_id.to_string(),
            success: false,
            message: String::new(),
            items_processed: entries.len(),
            extraction_failures,
            summary_failures,
            delivered: false,
        };

        if entries.is_empty() {
            outcome.message = "All AI summarization attempts failed".to_string();
            return Ok(outcome);
        }

        let html = render_report("Media Monitoring Report", &entries);
        let recipients: Vec<String> = recipient.into_iter().collect();
        let subject = dated("Media Monitoring Report");
        if !self.sender.send(&html, &recipients, Some(subject.as_str())).await {
            outcome.message = "Report generated but email sending failed".to_string();
            return Ok(outcome);
        }
        outcome.delivered = true;

        for id in delivered_ids {
            if !self.store.archive_pending(id).await? {
                warn!(report_id, id, "Article was no longer pending when archiving");
            }
        }

        outcome.success = true;
        outcome.message = format!(
            "Media report generated successfully. Processed {} items, {} scraping failures, {} summarization failures",
            outcome.items_processed, extraction_failures, summary_failures
        );
        Ok(outcome)
    }

    // ============ hansard report ============

    pub async fn run_hansard_report(&self, report_id: &str, recipient: Option<String>) -> RunOutcome {
        let outcome = self.hansard_pipeline(report_id, recipient).await;
        self.finish(outcome, report_id).await
    }

    async fn hansard_pipeline(&self, report_id: &str, recipient: Option<String>) -> Result<RunOutcome> {
        let pending = self.store.list_pending().await?;
        if pending.is_empty() {
            return Ok(RunOutcome::failed(report_id, "No pending articles available for Hansard report generation"));
        }

        self.status
            .set(report_id, ReportPhase::Running, "Starting Hansard report generation", 10)
            .await;
        self.status
            .set(report_id, ReportPhase::Running, "Scraping articles and generating questions", 50)
            .await;

        let mut sections = Vec::new();
        let mut source_ids = Vec::new();
        let mut extraction_failures = 0;
        for item in &pending {
            let result = self.extractor.extract(&item.url).await;
            if result.success {
                let title = result.title.filter(|t| !t.is_empty()).unwrap_or_else(|| item.url.clone());
                sections.push(content_unit(&title, &item.url, result.text.as_deref().unwrap_or_default()));
                source_ids.push(item.id);
            } else {
                // Hansard runs leave pending articles where they are.
                extraction_failures += 1;
                warn!(report_id, url = %item.url, error = result.error.as_deref().unwrap_or("unknown"), "Skipping article");
            }
        }

        if sections.is_empty() {
            let mut outcome = RunOutcome::failed(report_id, "No content could be scraped for Hansard report generation");
            outcome.extraction_failures = extraction_failures;
            return Ok(outcome);
        }

        let combined = sections.join(HANSARD_SEPARATOR);
        let result = self.summarizer.summarize(&combined, SummaryKind::Hansard, None).await;
        let questions = match result.summary.filter(|_| result.success) {
            Some(questions) => questions,
            None => {
                let mut outcome = RunOutcome::failed(
                    report_id,
                    format!(
                        "Failed to generate Hansard questions: {}",
                        result.error.as_deref().unwrap_or("unknown error")
                    ),
                );
                outcome.extraction_failures = extraction_failures;
                outcome.summary_failures = 1;
                return Ok(outcome);
            }
        };

        let record_id = self.store.insert_question(&questions, HANSARD_CATEGORY, &source_ids).await?;
        info!(report_id, record_id, sources = source_ids.len(), "Saved parliamentary questions");

        let entries = vec![ReportEntry::new(
            "Parliamentary Questions Based on Recent Media",
            questions,
            None,
            "System Generated",
        )];
        let html = render_report("Hansard Questions Report", &entries);
        let recipients: Vec<String> = recipient.into_iter().collect();
        let subject = dated("Hansard Questions Report");

        let mut outcome = RunOutcome {
            report_id: report_id.to_string(),
            success: false,
            message: String::new(),
            items_processed: source_ids.len(),
            extraction_failures,
            summary_failures: 0,
            delivered: false,
        };
        if !self.sender.send(&html, &recipients, Some(subject.as_str())).await {
            outcome.message = "Report generated but email sending failed".to_string();
            return Ok(outcome);
        }

        outcome.delivered = true;
        outcome.success = true;
        outcome.message = format!("Hansard report generated successfully from {} articles", source_ids.len());
        Ok(outcome)
    }

    // ============ single item and manual batch ============

    /// Extract and summarize one pending article and return the result. Nothing is moved.
    pub async fn process_pending_item(&self, id: i64) -> Result<ItemPreview> {
        let start = Instant::now();
        let item = self
            .store
            .get_pending(id)
            .await?
            .ok_or_else(|| MonitorError::not_found("Article", id))?;
        info!(id, url = %item.url, "Processing article");

        let mut preview = ItemPreview {
            article_id: item.id,
            url: item.url.clone(),
            submitted_by: item.submitted_by.clone(),
            success: false,
            error: None,
            extraction: None,
            summary: None,
            processing_time_ms: 0,
        };

        let extraction = self.extractor.extract(&item.url).await;
        if !extraction.success {
            preview.error = Some(format!(
                "Failed to scrape article: {}",
                extraction.error.as_deref().unwrap_or("unknown error")
            ));
            preview.processing_time_ms = start.elapsed().as_millis() as u64;
            return Ok(preview);
        }

        let title = extraction.title.clone().unwrap_or_default();
        let text = extraction.text.clone().unwrap_or_default();
        let content: String = text.chars().take(PREVIEW_CHARS).collect();
        preview.extraction = Some(ExtractedPreview {
            title: title.clone(),
            content: if text.chars().count() > PREVIEW_CHARS { format!("{}...", content) } else { content },
            authors: extraction.authors.clone(),
            publish_date: extraction.publish_date.clone(),
            word_count: text.split_whitespace().count(),
        });

        let unit = content_unit(&title, &item.url, &text);
        let result = self.summarizer.summarize(&unit, SummaryKind::Media, Some(&item.url)).await;
        match result.summary.filter(|_| result.success) {
            Some(summary) => {
                preview.success = true;
                preview.summary = Some(summary);
            }
            None => {
                preview.error = Some(format!(
                    "Failed to generate summary: {}",
                    result.error.as_deref().unwrap_or("unknown error")
                ));
            }
        }
        preview.processing_time_ms = start.elapsed().as_millis() as u64;
        Ok(preview)
    }

    /// Summarize every manual article that has content, send one report,
    /// and delete the summarized articles once the report is delivered.
    pub async fn process_manual_batch(&self, recipient: Option<String>) -> Result<RunOutcome> {
        let batch_id = new_report_id("manual_batch");
        let ready: Vec<_> = self
            .store
            .list_manual()
            .await?
            .into_iter()
            .filter(|item| item.has_content())
            .collect();
        if ready.is_empty() {
            return Ok(RunOutcome::failed(&batch_id, "No manual articles with content to process"));
        }

        let inputs: Vec<BatchInput> = ready
            .iter()
            .map(|item| BatchInput {
                text: content_unit("Manual Input Article", &item.url, item.content.as_deref().unwrap_or_default()),
                source_url: Some(item.url.clone()),
            })
            .collect();
        let batch = batch_summarize(self.summarizer.as_ref(), &inputs, SummaryKind::Media, self.batch_delay).await;

        let mut entries = Vec::new();
        let mut summarized_ids = Vec::new();
        let mut summary_failures = 0;
        for (item, result) in ready.iter().zip(batch.results) {
            match result.summary.filter(|_| result.success) {
                Some(summary) => {
                    summarized_ids.push(item.id);
                    entries.push(ReportEntry::new(
                        format!("Manual Input: {}", item.url),
                        summary,
                        Some(item.url.clone()),
                        item.submitted_by.clone(),
                    ));
                }
                None => {
                    summary_failures += 1;
                    warn!(id = item.id, error = result.error.as_deref().unwrap_or("unknown"), "Manual article summarization failed");
                }
            }
        }

        let mut outcome = RunOutcome {
            report_id: batch_id,
            success: false,
            message: String::new(),
            items_processed: entries.len(),
            extraction_failures: 0,
            summary_failures,
            delivered: false,
        };
        if entries.is_empty() {
            outcome.message = "All AI summarization attempts failed".to_string();
            return Ok(outcome);
        }

        let html = render_report("Manual Articles Processing Report", &entries);
        let recipients: Vec<String> = recipient.into_iter().collect();
        let subject = dated("Manual Articles Report");
        if !self.sender.send(&html, &recipients, Some(subject.as_str())).await {
            outcome.message = "Report generated but email sending failed".to_string();
            return Ok(outcome);
        }

        let deleted = self.store.delete_manual_many(&summarized_ids).await?;
        outcome.delivered = true;
        outcome.success = true;
        outcome.message = format!(
            "Manual articles processed successfully. Processed {} articles, {} summarization failures",
            deleted, summary_failures
        );
        info!(report_id = %outcome.report_id, deleted, "Manual batch delivered");
        Ok(outcome)
    }

    pub async fn recent_questions(&self, limit: Option<u32>) -> Result<Vec<ParliamentaryQuestionRecord>> {
        let limit = limit.unwrap_or(DEFAULT_RECENT_QUESTIONS);
        if !(1..=MAX_RECENT_QUESTIONS).contains(&limit) {
            return Err(MonitorError::invalid(format!(
                "limit must be between 1 and {}",
                MAX_RECENT_QUESTIONS
            )));
        }
        self.store.recent_questions(limit).await
    }
}
