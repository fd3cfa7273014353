use async_trait::async_trait;
use tracing::info;

use crate::defs::ContentExtractor;
use crate::defs::ExtractionResult;
use crate::defs::ReportSender;
use crate::defs::SummaryKind;
use crate::defs::SummaryResult;
use crate::defs::Summarizer;

// Fixed responses used when the service runs in local mode. Nothing here
// touches the network and every call succeeds.

pub const STUB_ARTICLE_TITLE: &str = "Mock Article: Breaking News in Technology";
pub const STUB_ARTICLE_TEXT: &str = "This is a mock article generated for local development and testing. \
It describes a fictional breakthrough in technology that is expected to change how people work and communicate. \
Industry experts say the development could have far-reaching effects across several sectors, \
while regulators have signalled that they will be watching the rollout closely.";
pub const STUB_PUBLISH_DATE: &str = "2025-08-23";
pub const STUB_TOKENS: u32 = 150;

#[derive(Debug, Default)]
pub struct StubExtractor;

impl StubExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContentExtractor for StubExtractor {
    fn extractor_name(&self) -> String {
        "stub extractor".to_owned()
    }

    async fn extract(&self, _url: &str) -> ExtractionResult {
        ExtractionResult::succeeded(
            STUB_ARTICLE_TITLE.to_owned(),
            STUB_ARTICLE_TEXT.to_owned(),
            vec!["Mock Author".to_owned(), "Test Writer".to_owned()],
            Some(STUB_PUBLISH_DATE.to_owned()),
        )
    }
}

#[derive(Debug, Default)]
pub struct StubSummarizer;

impl StubSummarizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Summarizer for StubSummarizer {
    fn summarizer_name(&self) -> String {
        "stub summarizer".to_owned()
    }

    async fn summarize(&self, text: &str, kind: SummaryKind, _source_url: Option<&str>) -> SummaryResult {
        // Short preview of the input keeps stub reports distinguishable.
        let preview: String = text.chars().take(100).collect();
        let summary = match kind {
            SummaryKind::Media => format!(
                "MOCK SUMMARY: This is a mock summary of the provided content. Preview: {}...",
                preview
            ),
            SummaryKind::Hansard => "MOCK HANSARD QUESTIONS: 1. What steps is the Government taking to address the issues raised in recent media coverage? \
2. Will the Minister make a statement on the impact of these developments on public services?"
                .to_owned(),
        };
        SummaryResult::succeeded(summary, STUB_TOKENS)
    }
}

#[derive(Debug, Default)]
pub struct StubSender;

#[async_trait]
impl ReportSender for StubSender {
    fn sender_name(&self) -> String {
        "stub sender".to_owned()
    }

    async fn send(&self, body: &str, recipients: &[String], subject: Option<&str>) -> bool {
        info!(?recipients, subject = subject.unwrap_or("(default)"), bytes = body.len(), "Local mode: report not sent");
        true
    }
}
