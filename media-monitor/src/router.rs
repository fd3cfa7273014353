use crate::config::normalize_domain;
use crate::security::{sanitize_text, validate_name, validate_url};
use crate::store::Store;
use crate::types::{Classification, MonitorError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use url::Url;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubmissionOutcome {
    pub id: i64,
    pub url: String,
    pub classification: Classification,
}

/// Routes submitted URLs either to the automatic pipeline or to the manual queue.
pub struct SubmissionRouter {
    store: Arc<Store>,
    manual_domains: HashSet<String>,
}

impl SubmissionRouter {
    pub fn new(store: Arc<Store>, manual_domains: HashSet<String>) -> Self {
        Self { store, manual_domains }
    }

    pub fn manual_domains(&self) -> &HashSet<String> {
        &self.manual_domains
    }

    /// Host of `url`, lowercased with any `www.` prefix removed.
    pub fn domain_of(url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        parsed.host_str().map(normalize_domain)
    }

    pub fn requires_manual(&self, url: &str) -> bool {
        Self::domain_of(url).is_some_and(|domain| self.manual_domains.contains(&domain))
    }

    /// Validate, deduplicate and store one submission.
    pub async fn submit(&self, url: &str, submitted_by: &str, pasted_text: Option<&str>) -> Result<SubmissionOutcome> {
        let url = validate_url(url)?;
        let submitted_by = validate_name(submitted_by)?;
        let pasted_text = match pasted_text.map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => Some(sanitize_text(text)?),
            None => None,
        };

        if let Some(location) = self.store.find_duplicate(&url).await? {
            info!(%url, %location, "Rejected duplicate submission");
            return Err(MonitorError::Duplicate { location });
        }

        if self.requires_manual(&url) {
            let id = self.store.insert_manual(&url, &submitted_by).await?;
            info!(%url, id, "Submission routed to manual processing");
            return Ok(SubmissionOutcome {
                id,
                url,
                classification: Classification::Manual,
            });
        }

        // The unique index still catches a concurrent submission of the same URL.
        let id = self.store.insert_pending(&url, &submitted_by, pasted_text.as_deref()).await?;
        info!(%url, id, "Submission queued for automatic processing");
        Ok(SubmissionOutcome {
            id,
            url,
            classification: Classification::Pending,
        })
    }
}
