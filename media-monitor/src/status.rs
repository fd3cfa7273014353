use crate::types::{MonitorError, ReportPhase, ReportRun, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory progress of report runs, keyed by report id.
///
/// Entries stay until a client clears a finished run or the process exits.
#[derive(Clone, Default)]
pub struct StatusTracker {
    runs: Arc<RwLock<HashMap<String, ReportRun>>>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the status of a run.
    pub async fn set(&self, report_id: &str, phase: ReportPhase, message: impl Into<String>, progress: u8) {
        let run = ReportRun {
            report_id: report_id.to_string(),
            phase,
            message: message.into(),
            progress: progress.min(100),
            updated_at: Utc::now(),
        };
        debug!(report_id, ?phase, progress = run.progress, "Report status updated");
        self.runs.write().await.insert(report_id.to_string(), run);
    }

    pub async fn get(&self, report_id: &str) -> Result<ReportRun> {
        self.runs
            .read()
            .await
            .get(report_id)
            .cloned()
            .ok_or_else(|| MonitorError::not_found("Report", report_id))
    }

    /// Remove a finished run. Runs still queued or in progress cannot be cleared.
    pub async fn clear(&self, report_id: &str) -> Result<()> {
        let mut runs = self.runs.write().await;
        let run = runs
            .get(report_id)
            .ok_or_else(|| MonitorError::not_found("Report", report_id))?;
        if !run.phase.is_terminal() {
            return Err(MonitorError::InvalidState(format!(
                "Report {} is still in progress and cannot be cleared",
                report_id
            )));
        }
        runs.remove(report_id);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}
