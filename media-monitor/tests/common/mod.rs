#![allow(dead_code)]

use async_trait::async_trait;
use media_monitor::orchestrator::ReportService;
use media_monitor::status::StatusTracker;
use media_monitor::store::Store;
use media_monitor::types::{
    ContentExtractor, ExtractionResult, ReportPhase, ReportRun, ReportSender, SummaryKind, SummaryResult, Summarizer,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub async fn memory_store() -> Arc<Store> {
    Arc::new(Store::in_memory().await.unwrap())
}

/// Extractor that fails for chosen URLs and records every call.
#[derive(Default)]
pub struct RecordingExtractor {
    failing: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
}

impl RecordingExtractor {
    pub fn failing_on(urls: &[&str]) -> Self {
        Self {
            failing: urls.iter().map(|u| u.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ContentExtractor for RecordingExtractor {
    fn extractor_name(&self) -> String {
        "recording extractor".to_string()
    }

    async fn extract(&self, url: &str) -> ExtractionResult {
        self.calls.lock().unwrap().push(url.to_string());
        if self.failing.contains(url) {
            return ExtractionResult::failed("HTTP error: 404");
        }
        ExtractionResult::succeeded(
            format!("Headline for {}", url),
            format!("Article body downloaded from {} with enough words to summarize.", url),
            vec!["Reporter".to_string()],
            None,
        )
    }
}

/// Summarizer that fails whenever the text contains one of the markers.
#[derive(Default)]
pub struct RecordingSummarizer {
    fail_markers: Vec<String>,
    pub calls: Mutex<Vec<(String, SummaryKind)>>,
}

impl RecordingSummarizer {
    pub fn failing_on(markers: &[&str]) -> Self {
        Self {
            fail_markers: markers.iter().map(|m| m.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always_failing() -> Self {
        Self::failing_on(&[""])
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }
}

#[async_trait]
impl Summarizer for RecordingSummarizer {
    fn summarizer_name(&self) -> String {
        "recording summarizer".to_string()
    }

    async fn summarize(&self, text: &str, kind: SummaryKind, _source_url: Option<&str>) -> SummaryResult {
        self.calls.lock().unwrap().push((text.to_string(), kind));
        if self.fail_markers.iter().any(|m| text.contains(m.as_str())) {
            return SummaryResult::failed("Rate limit or quota exceeded");
        }
        let first_line = text.lines().next().unwrap_or_default();
        SummaryResult::succeeded(format!("<p>Summary of {}</p>", first_line), 10)
    }
}

/// Summarizer that panics on every call.
pub struct PanickingSummarizer;

#[async_trait]
impl Summarizer for PanickingSummarizer {
    fn summarizer_name(&self) -> String {
        "panicking summarizer".to_string()
    }

    async fn summarize(&self, _text: &str, _kind: SummaryKind, _source_url: Option<&str>) -> SummaryResult {
        panic!("summarizer blew up")
    }
}

#[derive(Debug, Clone)]
pub struct SentReport {
    pub body: String,
    pub recipients: Vec<String>,
    pub subject: Option<String>,
}

/// Sender returning a fixed answer and keeping what it was asked to send.
pub struct RecordingSender {
    delivers: bool,
    pub sent: Mutex<Vec<SentReport>>,
}

impl RecordingSender {
    pub fn delivering() -> Self {
        Self { delivers: true, sent: Mutex::new(Vec::new()) }
    }

    pub fn rejecting() -> Self {
        Self { delivers: false, sent: Mutex::new(Vec::new()) }
    }

    pub fn sent(&self) -> Vec<SentReport> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportSender for RecordingSender {
    fn sender_name(&self) -> String {
        "recording sender".to_string()
    }

    async fn send(&self, body: &str, recipients: &[String], subject: Option<&str>) -> bool {
        self.sent.lock().unwrap().push(SentReport {
            body: body.to_string(),
            recipients: recipients.to_vec(),
            subject: subject.map(str::to_string),
        });
        self.delivers
    }
}

pub fn report_service(
    store: Arc<Store>,
    extractor: Arc<dyn ContentExtractor>,
    summarizer: Arc<dyn Summarizer>,
    sender: Arc<dyn ReportSender>,
) -> Arc<ReportService> {
    Arc::new(
        ReportService::new(store, extractor, summarizer, sender, StatusTracker::new()).with_batch_delay(Duration::ZERO),
    )
}

/// Poll until the run reaches a terminal phase.
pub async fn wait_for_terminal(status: &StatusTracker, report_id: &str) -> ReportRun {
    for _ in 0..200 {
        if let Ok(run) = status.get(report_id).await {
            if run.phase.is_terminal() {
                return run;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("report {} did not finish", report_id);
}

pub fn assert_phase(run: &ReportRun, phase: ReportPhase) {
    assert_eq!(run.phase, phase, "unexpected phase, message: {}", run.message);
}
