pub mod config;
pub mod extractor;
pub mod html;
pub mod logging;
pub mod orchestrator;
pub mod prompts;
pub mod rate_limit;
pub mod router;
pub mod security;
pub mod server;
pub mod status;
pub mod store;
pub mod summarizer;
pub mod types;

pub use types::*;
pub use config::Config;
pub use extractor::HttpExtractor;
pub use orchestrator::{ReportService, RunOutcome};
pub use router::{SubmissionOutcome, SubmissionRouter};
pub use server::{app, serve, AppState};
pub use status::StatusTracker;
pub use store::Store;
pub use summarizer::GeminiSummarizer;
