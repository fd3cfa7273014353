use crate::prompts::{build_prompt, truncate_content, MAX_CONTENT_CHARS};
use crate::rate_limit::CallRateLimiter;
use crate::types::{MonitorError, Result, SummaryKind, SummaryResult, Summarizer};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const MAX_OUTPUT_TOKENS: u32 = 1000;
pub const BATCH_DELAY: Duration = Duration::from_millis(500);

/// Map an upstream failure onto the message reported for it.
pub fn classify_error(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    if lowered.contains("quota") || lowered.contains("rate limit") || lowered.contains("rate_limit") || lowered.contains("resource_exhausted") {
        "Rate limit or quota exceeded".to_string()
    } else if lowered.contains("api_key") || lowered.contains("api key") || lowered.contains("authentication") || lowered.contains("permission_denied") {
        "Authentication failed - check API key".to_string()
    } else if lowered.contains("safety") || lowered.contains("blocked") {
        "Content was blocked by safety filters".to_string()
    } else if lowered.contains("token") && lowered.contains("limit") {
        "Content too long - exceeds token limit".to_string()
    } else {
        format!("Unexpected error: {}", raw)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u32>,
}

impl GenerateResponse {
    /// Summary text and token count, or the raw reason there is none.
    fn into_summary(self) -> std::result::Result<(String, u32), String> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(format!("Prompt blocked: {}", reason));
        }
        let tokens = self.usage_metadata.and_then(|u| u.total_token_count).unwrap_or(0);
        let candidate = self.candidates.into_iter().next().ok_or("Empty response from model")?;
        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err("Response blocked for safety".to_string());
        }
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err("Empty response from model".to_string());
        }
        Ok((text, tokens))
    }
}

/// Summarizer backed by the Gemini `generateContent` API.
pub struct GeminiSummarizer {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
    max_output_tokens: u32,
    rate_limiter: Arc<CallRateLimiter>,
}

impl GeminiSummarizer {
    pub fn new(api_key: String, model: String, rate_limiter: Arc<CallRateLimiter>) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(MonitorError::Config("Gemini API key is required".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            api_key,
            model,
            api_base: GEMINI_API_BASE.to_string(),
            max_output_tokens: MAX_OUTPUT_TOKENS,
            rate_limiter,
        })
    }

    /// Point at a different API root; used against local fakes.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Lower the per-response output budget below the default.
    pub fn with_token_budget(mut self, budget: u32) -> Self {
        self.max_output_tokens = budget.clamp(1, MAX_OUTPUT_TOKENS);
        self
    }

    async fn generate(&self, prompt: &str) -> std::result::Result<(String, u32), String> {
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.1,
                "topP": 0.8,
                "topK": 40,
                "maxOutputTokens": self.max_output_tokens,
            }
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                429 => "quota exceeded".to_string(),
                401 | 403 => format!("authentication rejected: {}", detail),
                _ => format!("HTTP {}: {}", status.as_u16(), detail),
            });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| e.to_string())?;
        parsed.into_summary()
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    fn summarizer_name(&self) -> String {
        format!("gemini ({})", self.model)
    }

    async fn summarize(&self, text: &str, kind: SummaryKind, source_url: Option<&str>) -> SummaryResult {
        if text.trim().is_empty() {
            return SummaryResult::failed("No content provided");
        }

        let content = truncate_content(text, MAX_CONTENT_CHARS);
        if content.len() != text.len() {
            warn!(chars = text.chars().count(), "Content truncated before summarization");
        }
        let prompt = build_prompt(kind, &content, source_url);

        self.rate_limiter.acquire().await;
        debug!(model = %self.model, ?kind, "Requesting summary");

        match self.generate(&prompt).await {
            Ok((summary, tokens)) => {
                info!(?kind, tokens, "Summary generated");
                SummaryResult::succeeded(summary, tokens)
            }
            Err(raw) => {
                let message = classify_error(&raw);
                error!(?kind, error = %raw, "Summarization failed: {}", message);
                SummaryResult::failed(message)
            }
        }
    }
}

/// One unit of a batch: the text to summarize and, for media, its source URL.
#[derive(Debug, Clone)]
pub struct BatchInput {
    pub text: String,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BatchSummary {
    /// One result per input, in input order.
    pub results: Vec<SummaryResult>,
    pub total_tokens: u32,
}

impl BatchSummary {
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }
}

/// Summarize inputs one after another with a pause between calls.
pub async fn batch_summarize(
    summarizer: &dyn Summarizer,
    inputs: &[BatchInput],
    kind: SummaryKind,
    delay: Duration,
) -> BatchSummary {
    let mut results = Vec::with_capacity(inputs.len());
    let mut total_tokens = 0;

    for (index, input) in inputs.iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let result = summarizer.summarize(&input.text, kind, input.source_url.as_deref()).await;
        total_tokens += result.tokens_used;
        results.push(result);
    }

    let summary = BatchSummary { results, total_tokens };
    info!(
        items = inputs.len(),
        succeeded = summary.success_count(),
        total_tokens,
        "Batch summarization finished with {}",
        summarizer.summarizer_name()
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_upstream_errors() {
        assert_eq!(classify_error("429 quota exceeded"), "Rate limit or quota exceeded");
        assert_eq!(classify_error("API_KEY_INVALID"), "Authentication failed - check API key");
        assert_eq!(classify_error("Response blocked for safety"), "Content was blocked by safety filters");
        assert_eq!(classify_error("input token count exceeds the limit"), "Content too long - exceeds token limit");
        assert_eq!(classify_error("Rate limit hit"), "Rate limit or quota exceeded");
        assert_eq!(classify_error("connection reset"), "Unexpected error: connection reset");
        assert_eq!(classify_error("HTTP 500: generateContent failed"), "Unexpected error: HTTP 500: generateContent failed");
    }

    #[test]
    fn parses_generate_response() {
        let raw = r#"{
            "candidates": [{"content": {"parts": [{"text": "<p>Summary</p>"}]}, "finishReason": "STOP"}],
            "usageMetadata": {"promptTokenCount": 10, "totalTokenCount": 42}
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.into_summary().unwrap(), ("<p>Summary</p>".to_string(), 42));
    }

    #[test]
    fn blocked_responses_classify_as_safety() {
        let raw = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        let reason = parsed.into_summary().unwrap_err();
        assert_eq!(classify_error(&reason), "Content was blocked by safety filters");
    }

    /// Fails any text containing "reject"; otherwise spends one token per word.
    struct WordCountSummarizer;

    #[async_trait]
    impl Summarizer for WordCountSummarizer {
        fn summarizer_name(&self) -> String {
            "word count".to_string()
        }

        async fn summarize(&self, text: &str, _kind: SummaryKind, _source_url: Option<&str>) -> SummaryResult {
            if text.contains("reject") {
                return SummaryResult::failed("Content was blocked by safety filters");
            }
            SummaryResult::succeeded(format!("<p>{}</p>", text), text.split_whitespace().count() as u32)
        }
    }

    fn input(text: &str) -> BatchInput {
        BatchInput {
            text: text.to_string(),
            source_url: None,
        }
    }

    #[tokio::test]
    async fn batch_keeps_one_result_per_input_in_order() {
        let inputs = vec![
            input("first story here"),
            input("reject this one"),
            input("second"),
            input("reject again please"),
            input("third story"),
        ];
        let batch = batch_summarize(&WordCountSummarizer, &inputs, SummaryKind::Media, Duration::ZERO).await;

        assert_eq!(batch.results.len(), 5);
        assert_eq!(batch.success_count(), 3);
        let outcomes: Vec<bool> = batch.results.iter().map(|r| r.success).collect();
        assert_eq!(outcomes, vec![true, false, true, false, true]);
        assert_eq!(batch.results[0].summary.as_deref(), Some("<p>first story here</p>"));
        assert_eq!(batch.results[4].summary.as_deref(), Some("<p>third story</p>"));
        assert_eq!(batch.total_tokens, 3 + 1 + 2);
    }

    #[tokio::test]
    async fn empty_batch_makes_no_calls() {
        let batch = batch_summarize(&WordCountSummarizer, &[], SummaryKind::Hansard, Duration::from_secs(5)).await;
        assert!(batch.results.is_empty());
        assert_eq!(batch.success_count(), 0);
        assert_eq!(batch.total_tokens, 0);
    }

    #[tokio::test]
    async fn empty_text_fails_without_calling_upstream() {
        let summarizer = GeminiSummarizer::new(
            "key".to_string(),
            "gemini-1.5-flash".to_string(),
            Arc::new(CallRateLimiter::per_minute(50)),
        )
        .unwrap()
        .with_api_base("http://127.0.0.1:9");
        let result = summarizer.summarize("   ", SummaryKind::Media, None).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No content provided"));
    }
}
