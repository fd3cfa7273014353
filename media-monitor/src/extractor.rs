use crate::html::extract_article;
use crate::types::{ContentExtractor, ExtractionResult, MonitorError, Result, ScrapeConfig};
use async_trait::async_trait;
use backoff::backoff::{Backoff, Constant};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Why one download attempt failed, and whether another attempt may help.
#[derive(Debug)]
enum AttemptError {
    Retryable(String),
    Fatal(String),
}

/// Downloads article pages over HTTP and extracts their text.
pub struct HttpExtractor {
    client: Client,
    config: ScrapeConfig,
}

impl HttpExtractor {
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(MonitorError::Http)?;

        Ok(Self { client, config })
    }

    fn describe(&self, error: &reqwest::Error) -> String {
        if error.is_timeout() {
            format!("Request timeout after {} seconds", self.config.timeout_seconds)
        } else if error.is_connect() {
            "Connection error - unable to reach URL".to_string()
        } else {
            format!("Request failed: {}", error)
        }
    }

    async fn download(&self, url: &str) -> std::result::Result<String, AttemptError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(self.describe(&e)))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(AttemptError::Fatal(format!("HTTP error: {}", status.as_u16())));
        }
        if !status.is_success() {
            return Err(AttemptError::Retryable(format!("HTTP error: {}", status.as_u16())));
        }

        response
            .text()
            .await
            .map_err(|e| AttemptError::Retryable(self.describe(&e)))
    }
}

#[async_trait]
impl ContentExtractor for HttpExtractor {
    fn extractor_name(&self) -> String {
        "http".to_string()
    }

    async fn extract(&self, url: &str) -> ExtractionResult {
        if Url::parse(url).is_err() {
            return ExtractionResult::failed("Invalid URL format");
        }

        let start_time = Instant::now();
        let attempts = self.config.max_retries.max(1);
        let mut delay = Constant::new(Duration::from_secs(self.config.retry_delay_seconds));
        let mut last_error = String::from("No content could be extracted");

        for attempt in 1..=attempts {
            debug!(%url, attempt, "Downloading article");
            match self.download(url).await {
                Ok(html) => {
                    // A page that downloads but has no article text will not improve on retry.
                    return match extract_article(&html) {
                        Some(article) => {
                            info!(
                                %url,
                                chars = article.text.len(),
                                elapsed_ms = start_time.elapsed().as_millis() as u64,
                                "Extracted article"
                            );
                            ExtractionResult::succeeded(article.title, article.text, article.authors, article.publish_date)
                        }
                        None => {
                            warn!(%url, "No content could be extracted");
                            ExtractionResult::failed("No content could be extracted")
                        }
                    };
                }
                Err(AttemptError::Fatal(message)) => {
                    warn!(%url, error = %message, "Client error, not retrying");
                    return ExtractionResult::failed(message);
                }
                Err(AttemptError::Retryable(message)) => {
                    last_error = message;
                    if attempt < attempts {
                        if let Some(wait) = delay.next_backoff() {
                            warn!(%url, attempt, error = %last_error, "Attempt failed, retrying in {:?}", wait);
                            tokio::time::sleep(wait).await;
                        }
                    }
                }
            }
        }

        warn!(%url, attempts, error = %last_error, "Giving up on article");
        ExtractionResult::failed(last_error)
    }
}
