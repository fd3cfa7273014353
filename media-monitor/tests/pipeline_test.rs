mod common;

use common::*;
use interfaces::{StubExtractor, StubSender, StubSummarizer};
use media_monitor::orchestrator::HANSARD_SEPARATOR;
use media_monitor::types::{MonitorError, ReportPhase, SummaryKind};
use std::sync::Arc;

const GOOD: &str = "https://news.example.com/good";
const BROKEN: &str = "https://news.example.com/broken";
const UNSUMMARIZABLE: &str = "https://news.example.com/unsummarizable";

#[tokio::test]
async fn media_run_demotes_failures_and_archives_delivered_items() {
    init_tracing();
    let store = memory_store().await;
    let good = store.insert_pending(GOOD, "Alice", None).await.unwrap();
    store.insert_pending(BROKEN, "Bob", None).await.unwrap();
    let unsummarizable = store.insert_pending(UNSUMMARIZABLE, "Carol", None).await.unwrap();

    let sender = Arc::new(RecordingSender::delivering());
    let service = report_service(
        store.clone(),
        Arc::new(RecordingExtractor::failing_on(&[BROKEN])),
        Arc::new(RecordingSummarizer::failing_on(&[UNSUMMARIZABLE])),
        sender.clone(),
    );

    let outcome = service
        .run_media_report("media_report_test", None, Some("editor@example.com".to_string()))
        .await;
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(
        outcome.message,
        "Media report generated successfully. Processed 1 items, 1 scraping failures, 1 summarization failures"
    );

    // extraction failure went to the manual queue
    let manual = store.list_manual().await.unwrap();
    assert_eq!(manual.len(), 1);
    assert_eq!(manual[0].url, BROKEN);
    assert_eq!(manual[0].submitted_by, "Bob");

    // only the delivered summary was archived, the failed summary stays pending
    let archived = store.list_archived().await.unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].url, GOOD);
    assert!(store.get_pending(good).await.unwrap().is_none());
    let pending = store.list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, unsummarizable);

    let sent = sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipients, vec!["editor@example.com".to_string()]);
    assert!(sent[0].subject.as_deref().unwrap().starts_with("Media Monitoring Report - "));
    assert!(sent[0].body.contains("Media Monitoring Report"));
    assert!(sent[0].body.contains(&format!("Headline for {}", GOOD)));
    assert!(sent[0].body.contains("Alice"));
    assert!(sent[0].body.contains("Report contains 1 article."));

    let run = service.status().get("media_report_test").await.unwrap();
    assert_phase(&run, ReportPhase::Completed);
    assert_eq!(run.progress, 100);
}

#[tokio::test]
async fn failed_delivery_leaves_items_pending_but_keeps_demotions() {
    let store = memory_store().await;
    store.insert_pending(GOOD, "Alice", None).await.unwrap();
    store.insert_pending(BROKEN, "Bob", None).await.unwrap();

    let service = report_service(
        store.clone(),
        Arc::new(RecordingExtractor::failing_on(&[BROKEN])),
        Arc::new(RecordingSummarizer::default()),
        Arc::new(RecordingSender::rejecting()),
    );

    let outcome = service.run_media_report("media_report_undelivered", None, None).await;
    assert!(!outcome.success);
    assert!(!outcome.delivered);
    assert_eq!(outcome.message, "Report generated but email sending failed");

    let pending = store.list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].url, GOOD);
    assert!(store.list_archived().await.unwrap().is_empty());
    assert_eq!(store.list_manual().await.unwrap().len(), 1);

    let run = service.status().get("media_report_undelivered").await.unwrap();
    assert_phase(&run, ReportPhase::Failed);
    assert_eq!(run.message, "Report generated but email sending failed");
}

#[tokio::test]
async fn empty_run_fails_without_touching_collaborators() {
    let store = memory_store().await;
    let extractor = Arc::new(RecordingExtractor::default());
    let summarizer = Arc::new(RecordingSummarizer::default());
    let sender = Arc::new(RecordingSender::delivering());
    let service = report_service(store, extractor.clone(), summarizer.clone(), sender.clone());

    let report_id = service.start_media_report(Some("   ".to_string()), None).await;
    assert!(report_id.starts_with("media_report_"));

    let run = wait_for_terminal(service.status(), &report_id).await;
    assert_phase(&run, ReportPhase::Failed);
    assert_eq!(run.message, "No pending articles or pasted content to process");
    assert_eq!(run.progress, 0);
    assert_eq!(extractor.call_count(), 0);
    assert_eq!(summarizer.call_count(), 0);
    assert!(sender.sent().is_empty());
}

#[tokio::test]
async fn panicking_run_is_marked_failed_and_can_be_cleared() {
    let store = memory_store().await;
    let id = store.insert_pending(GOOD, "Alice", None).await.unwrap();
    let sender = Arc::new(RecordingSender::delivering());
    let service = report_service(
        store.clone(),
        Arc::new(RecordingExtractor::default()),
        Arc::new(PanickingSummarizer),
        sender.clone(),
    );

    let report_id = service.start_media_report(None, None).await;
    let run = wait_for_terminal(service.status(), &report_id).await;
    assert_phase(&run, ReportPhase::Failed);
    assert!(run.message.starts_with("Report generation failed"), "{}", run.message);
    assert_eq!(run.progress, 0);

    service.status().clear(&report_id).await.unwrap();
    assert!(service.status().get(&report_id).await.is_err());
    assert!(sender.sent().is_empty());
    assert_eq!(store.list_pending().await.unwrap()[0].id, id);
}

#[tokio::test]
async fn pasted_content_alone_produces_a_report() {
    let store = memory_store().await;
    let summarizer = Arc::new(RecordingSummarizer::default());
    let sender = Arc::new(RecordingSender::delivering());
    let service = report_service(
        store,
        Arc::new(RecordingExtractor::default()),
        summarizer.clone(),
        sender.clone(),
    );

    let outcome = service
        .run_media_report("media_report_pasted", Some("Minister resigns over budget row".to_string()), None)
        .await;
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(summarizer.texts(), vec!["Pasted Content:\nMinister resigns over budget row".to_string()]);

    let body = &sender.sent()[0].body;
    assert!(body.contains("Pasted Content Summary"));
    assert!(body.contains("Manual Entry"));
}

#[tokio::test]
async fn run_fails_when_every_summary_fails() {
    let store = memory_store().await;
    store.insert_pending(GOOD, "Alice", None).await.unwrap();
    let sender = Arc::new(RecordingSender::delivering());
    let service = report_service(
        store.clone(),
        Arc::new(RecordingExtractor::default()),
        Arc::new(RecordingSummarizer::always_failing()),
        sender.clone(),
    );

    let outcome = service.run_media_report("media_report_nosummary", None, None).await;
    assert!(!outcome.success);
    assert_eq!(outcome.message, "All AI summarization attempts failed");
    assert!(sender.sent().is_empty());
    assert_eq!(store.list_pending().await.unwrap().len(), 1);
}

#[tokio::test]
async fn run_fails_when_nothing_could_be_extracted() {
    let store = memory_store().await;
    store.insert_pending(BROKEN, "Bob", None).await.unwrap();
    let service = report_service(
        store.clone(),
        Arc::new(RecordingExtractor::failing_on(&[BROKEN])),
        Arc::new(RecordingSummarizer::default()),
        Arc::new(RecordingSender::delivering()),
    );

    let outcome = service.run_media_report("media_report_noextract", None, None).await;
    assert!(!outcome.success);
    assert_eq!(outcome.message, "No content available for processing after scraping");
    assert!(store.list_pending().await.unwrap().is_empty());
    assert_eq!(store.list_manual().await.unwrap().len(), 1);
}

#[tokio::test]
async fn local_mode_run_archives_everything() {
    let store = memory_store().await;
    store.insert_pending("https://a.example.com/1", "Alice", None).await.unwrap();
    store.insert_pending("https://b.example.com/2", "Bob", None).await.unwrap();

    let service = report_service(
        store.clone(),
        Arc::new(StubExtractor::new()),
        Arc::new(StubSummarizer::new()),
        Arc::new(StubSender),
    );

    let report_id = service.start_media_report(None, None).await;
    let run = wait_for_terminal(service.status(), &report_id).await;
    assert_phase(&run, ReportPhase::Completed);
    assert_eq!(
        run.message,
        "Media report generated successfully. Processed 2 items, 0 scraping failures, 0 summarization failures"
    );
    assert!(store.list_pending().await.unwrap().is_empty());
    assert_eq!(store.list_archived().await.unwrap().len(), 2);
}

#[tokio::test]
async fn hansard_run_records_questions_without_moving_articles() {
    let store = memory_store().await;
    let first = store.insert_pending("https://news.example.com/one", "Alice", None).await.unwrap();
    let second = store.insert_pending("https://news.example.com/two", "Bob", None).await.unwrap();
    store.insert_pending(BROKEN, "Carol", None).await.unwrap();

    let summarizer = Arc::new(RecordingSummarizer::default());
    let sender = Arc::new(RecordingSender::delivering());
    let service = report_service(
        store.clone(),
        Arc::new(RecordingExtractor::failing_on(&[BROKEN])),
        summarizer.clone(),
        sender.clone(),
    );

    let outcome = service.run_hansard_report("hansard_report_test", None).await;
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.message, "Hansard report generated successfully from 2 articles");

    // one combined call
    let calls = summarizer.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, SummaryKind::Hansard);
    assert!(calls[0].0.contains(HANSARD_SEPARATOR));

    // nothing archived, nothing demoted
    assert_eq!(store.list_pending().await.unwrap().len(), 3);
    assert!(store.list_manual().await.unwrap().is_empty());
    assert!(store.list_archived().await.unwrap().is_empty());

    let questions = service.recent_questions(None).await.unwrap();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].category, "Media-based Questions");
    let mut sources = questions[0].source_item_ids.clone();
    sources.sort();
    assert_eq!(sources, vec![first, second]);

    let sent = sender.sent();
    assert!(sent[0].body.contains("Hansard Questions Report"));
    assert!(sent[0].body.contains("Parliamentary Questions Based on Recent Media"));
    assert!(sent[0].body.contains("System Generated"));
}

#[tokio::test]
async fn hansard_run_reports_each_failure() {
    let store = memory_store().await;
    let service = report_service(
        store.clone(),
        Arc::new(RecordingExtractor::failing_on(&[BROKEN])),
        Arc::new(RecordingSummarizer::always_failing()),
        Arc::new(RecordingSender::delivering()),
    );

    let outcome = service.run_hansard_report("hansard_empty", None).await;
    assert_eq!(outcome.message, "No pending articles available for Hansard report generation");

    store.insert_pending(BROKEN, "Bob", None).await.unwrap();
    let outcome = service.run_hansard_report("hansard_unscraped", None).await;
    assert_eq!(outcome.message, "No content could be scraped for Hansard report generation");
    assert_eq!(store.list_pending().await.unwrap().len(), 1);

    store.insert_pending(GOOD, "Alice", None).await.unwrap();
    let outcome = service.run_hansard_report("hansard_unsummarized", None).await;
    assert_eq!(outcome.message, "Failed to generate Hansard questions: Rate limit or quota exceeded");
    assert!(service.recent_questions(None).await.unwrap().is_empty());

    let run = service.status().get("hansard_unsummarized").await.unwrap();
    assert_phase(&run, ReportPhase::Failed);
}

#[tokio::test]
async fn manual_batch_deletes_only_after_delivery() {
    let store = memory_store().await;
    let ready = store.insert_manual("https://paywalled.example.com/a", "Alice").await.unwrap();
    let waiting = store.insert_manual("https://paywalled.example.com/b", "Bob").await.unwrap();
    store.update_manual_content(ready, "Full text pasted by an editor").await.unwrap();

    let rejecting = report_service(
        store.clone(),
        Arc::new(RecordingExtractor::default()),
        Arc::new(RecordingSummarizer::default()),
        Arc::new(RecordingSender::rejecting()),
    );
    let outcome = rejecting.process_manual_batch(None).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(store.list_manual().await.unwrap().len(), 2);

    let sender = Arc::new(RecordingSender::delivering());
    let summarizer = Arc::new(RecordingSummarizer::default());
    let delivering = report_service(
        store.clone(),
        Arc::new(RecordingExtractor::default()),
        summarizer.clone(),
        sender.clone(),
    );
    let outcome = delivering.process_manual_batch(Some("desk@example.com".to_string())).await.unwrap();
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(outcome.items_processed, 1);

    let texts = summarizer.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("Title: Manual Input Article\nURL: https://paywalled.example.com/a"));

    let remaining = store.list_manual().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, waiting);

    let sent = sender.sent();
    assert!(sent[0].body.contains("Manual Articles Processing Report"));
    assert!(sent[0].body.contains("Manual Input: https://paywalled.example.com/a"));
    assert!(sent[0].subject.as_deref().unwrap().starts_with("Manual Articles Report - "));
}

#[tokio::test]
async fn manual_batch_without_content_is_a_failure() {
    let store = memory_store().await;
    store.insert_manual("https://paywalled.example.com/a", "Alice").await.unwrap();
    let service = report_service(
        store,
        Arc::new(RecordingExtractor::default()),
        Arc::new(RecordingSummarizer::default()),
        Arc::new(RecordingSender::delivering()),
    );
    let outcome = service.process_manual_batch(None).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.message, "No manual articles with content to process");
}

#[tokio::test]
async fn processing_one_item_is_a_preview() {
    let store = memory_store().await;
    let id = store.insert_pending(GOOD, "Alice", None).await.unwrap();
    let broken = store.insert_pending(BROKEN, "Bob", None).await.unwrap();
    let service = report_service(
        store.clone(),
        Arc::new(RecordingExtractor::failing_on(&[BROKEN])),
        Arc::new(RecordingSummarizer::default()),
        Arc::new(RecordingSender::delivering()),
    );

    let preview = service.process_pending_item(id).await.unwrap();
    assert!(preview.success);
    assert!(preview.summary.unwrap().starts_with("<p>Summary of Title: Headline for"));
    assert_eq!(preview.extraction.unwrap().authors, vec!["Reporter".to_string()]);

    let failed = service.process_pending_item(broken).await.unwrap();
    assert!(!failed.success);
    assert_eq!(failed.error.as_deref(), Some("Failed to scrape article: HTTP error: 404"));

    assert_eq!(store.list_pending().await.unwrap().len(), 2);
    assert!(store.list_manual().await.unwrap().is_empty());

    assert!(matches!(
        service.process_pending_item(9999).await,
        Err(MonitorError::NotFound { .. })
    ));
}

#[tokio::test]
async fn recent_question_limit_is_bounded() {
    let store = memory_store().await;
    for n in 0..3 {
        store.insert_question(&format!("Question set {}", n), "Media-based Questions", &[]).await.unwrap();
    }
    let service = report_service(
        store,
        Arc::new(RecordingExtractor::default()),
        Arc::new(RecordingSummarizer::default()),
        Arc::new(RecordingSender::delivering()),
    );

    assert_eq!(service.recent_questions(Some(2)).await.unwrap().len(), 2);
    assert_eq!(service.recent_questions(None).await.unwrap().len(), 3);
    assert!(matches!(service.recent_questions(Some(0)).await, Err(MonitorError::InvalidInput(_))));
    assert!(matches!(service.recent_questions(Some(101)).await, Err(MonitorError::InvalidInput(_))));
}
