//! JSON HTTP API over the submission router and report service.
//!
//! # Error contract
//!
//! ```json
//! { "error": { "code": "DUPLICATE_URL", "message": "...", "location": "pending" } }
//! ```
//!
//! Codes: `INVALID_INPUT` (400), `INVALID_STATE` (400), `NOT_FOUND` and
//! `REPORT_NOT_FOUND` (404), `DUPLICATE_URL` (409), `RATE_LIMIT_EXCEEDED`
//! (429, with `Retry-After`), `INTERNAL_ERROR` (500).

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, rejection::PathRejection, rejection::QueryRejection, ConnectInfo, Path, Query, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use interfaces::{StubExtractor, StubSender, StubSummarizer};
use report_delivery::{SmtpConfig, SmtpSender, WebhookSender};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{load_manual_sites, Config};
use crate::extractor::HttpExtractor;
use crate::orchestrator::ReportService;
use crate::rate_limit::{ApiRateLimiter, CallRateLimiter};
use crate::router::SubmissionRouter;
use crate::security::{sanitize_text, validate_email};
use crate::status::StatusTracker;
use crate::store::Store;
use crate::summarizer::GeminiSummarizer;
use crate::types::{Classification, ContentExtractor, DuplicateLocation, MonitorError, ReportSender, Result, Summarizer};

/// Model calls allowed per minute before callers are made to wait.
pub const MODEL_CALLS_PER_MINUTE: usize = 50;

/// Shared application state passed to every handler.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<Store>,
    router: Arc<SubmissionRouter>,
    reports: Arc<ReportService>,
    api_limiter: Arc<ApiRateLimiter>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<Store>, router: Arc<SubmissionRouter>, reports: Arc<ReportService>) -> Self {
        let api_limiter = ApiRateLimiter::new(
            config.rate_limit_requests,
            Duration::from_secs(config.rate_limit_window_seconds),
        );
        Self {
            config: Arc::new(config),
            store,
            router,
            reports,
            api_limiter: Arc::new(api_limiter),
        }
    }

    /// Open the store and wire real collaborators, or the stubs in local mode.
    pub async fn from_config(config: Config) -> Result<Self> {
        let store = Arc::new(Store::connect(&config.database_url).await?);
        let manual_sites = load_manual_sites(&config.manual_sites_file)?;
        let router = Arc::new(SubmissionRouter::new(store.clone(), manual_sites));

        let (extractor, summarizer, sender) = collaborators(&config)?;
        let reports = Arc::new(ReportService::new(
            store.clone(),
            extractor,
            summarizer,
            sender,
            StatusTracker::new(),
        ));
        Ok(Self::new(config, store, router, reports))
    }
}

type Collaborators = (Arc<dyn ContentExtractor>, Arc<dyn Summarizer>, Arc<dyn ReportSender>);

fn collaborators(config: &Config) -> Result<Collaborators> {
    if config.local_mode {
        info!("Local mode: extraction, summarization and delivery are stubbed");
        let extractor: Arc<dyn ContentExtractor> = Arc::new(StubExtractor::new());
        let summarizer: Arc<dyn Summarizer> = Arc::new(StubSummarizer::new());
        let sender: Arc<dyn ReportSender> = Arc::new(StubSender);
        return Ok((extractor, summarizer, sender));
    }

    let extractor = HttpExtractor::new(config.scrape.clone())?;

    let api_key = config
        .gemini_api_key
        .clone()
        .ok_or_else(|| MonitorError::Config("GEMINI_API_KEY is required".to_string()))?;
    let limiter = Arc::new(CallRateLimiter::per_minute(MODEL_CALLS_PER_MINUTE));
    let summarizer = GeminiSummarizer::new(api_key, config.gemini_model.clone(), limiter)?
        .with_token_budget(config.gemini_max_tokens);

    let sender: Arc<dyn ReportSender> = match &config.webhook_url {
        Some(url) => Arc::new(
            WebhookSender::new(url, config.email_recipients.clone()).map_err(|e| MonitorError::Config(e.to_string()))?,
        ),
        None => {
            let smtp = SmtpConfig {
                host: config.smtp.host.clone().unwrap_or_default(),
                port: config.smtp.port,
                username: config.smtp.username.clone(),
                password: config.smtp.password.clone(),
                use_tls: config.smtp.use_tls,
                from: config.email_from.clone().unwrap_or_default(),
            };
            Arc::new(
                SmtpSender::new(&smtp, config.email_recipients.clone()).map_err(|e| MonitorError::Config(e.to_string()))?,
            )
        }
    };

    let extractor: Arc<dyn ContentExtractor> = Arc::new(extractor);
    let summarizer: Arc<dyn Summarizer> = Arc::new(summarizer);
    Ok((extractor, summarizer, sender))
}

/// Build the full router with middleware.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/api/articles/submit", post(submit_article))
        .route("/api/articles/pending", get(list_pending))
        .route("/api/articles/process/{id}", post(process_article))
        .route("/api/manual-articles", get(list_manual))
        .route("/api/manual-articles/", get(list_manual))
        .route("/api/manual-articles/process-batch", post(process_manual_batch))
        .route("/api/manual-articles/{id}", post(update_manual).delete(delete_manual))
        .route("/api/reports/media", post(start_media_report))
        .route("/api/reports/hansard", post(start_hansard_report))
        .route("/api/reports/hansard/recent", get(recent_questions))
        .route("/api/reports/status/{id}", get(report_status).delete(clear_report_status))
        .route("/api/csrf-token", get(csrf_token))
        .route("/health", get(health))
        .route("/health/simple", get(health_simple))
        .route("/version", get(version))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(middleware::from_fn(security_headers))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let bind_addr = config.bind_address();
    let state = AppState::from_config(config).await?;
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Media monitor listening on http://{}", bind_addr);
    axum::serve(listener, app(state).into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

// ============ Middleware ============

async fn security_headers(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert("x-xss-protection", HeaderValue::from_static("1; mode=block"));
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'"),
    );
    headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("strict-origin-when-cross-origin"));
    headers.insert("permissions-policy", HeaderValue::from_static("geolocation=(), microphone=(), camera=()"));
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert("x-request-id", value);
    }
    response
}

async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if request.uri().path().starts_with("/health") {
        return next.run(request).await;
    }
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    match state.api_limiter.check(&client) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            warn!(%client, retry_after, "Rate limit exceeded");
            AppError::rate_limited(retry_after).into_response()
        }
    }
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<DuplicateLocation>,
}

pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
    location: Option<DuplicateLocation>,
    retry_after: Option<u64>,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            location: None,
            retry_after: None,
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_INPUT", message)
    }

    fn rate_limited(retry_after: u64) -> Self {
        Self {
            retry_after: Some(retry_after),
            ..Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT_EXCEEDED",
                format!("Too many requests, retry after {} seconds", retry_after),
            )
        }
    }
}

impl From<MonitorError> for AppError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::InvalidInput(message) => AppError::invalid(message),
            MonitorError::Duplicate { location } => AppError {
                location: Some(location),
                ..AppError::new(
                    StatusCode::CONFLICT,
                    "DUPLICATE_URL",
                    format!("This URL has already been submitted ({})", location),
                )
            },
            MonitorError::NotFound { what: "Report", id } => {
                AppError::new(StatusCode::NOT_FOUND, "REPORT_NOT_FOUND", format!("Report not found: {}", id))
            }
            err @ MonitorError::NotFound { .. } => AppError::new(StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
            MonitorError::InvalidState(message) => AppError::new(StatusCode::BAD_REQUEST, "INVALID_STATE", message),
            other => {
                error!(error = %other, "Request failed");
                AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "An internal error occurred")
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::invalid(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::invalid(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::invalid(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                location: self.location,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(seconds) = self.retry_after {
            response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

type ApiResult<T> = std::result::Result<T, AppError>;

/// Parse a JSON body that may be empty.
fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::invalid(format!("Invalid JSON body: {}", e)))
}

fn recipient(raw: Option<String>) -> ApiResult<Option<String>> {
    match raw.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(email) => Ok(Some(validate_email(email)?)),
        None => Ok(None),
    }
}

// ============ Articles ============

#[derive(Deserialize)]
struct SubmitRequest {
    url: String,
    submitted_by: String,
    #[serde(default)]
    pasted_text: Option<String>,
}

#[derive(Serialize)]
struct SubmitResponse {
    success: bool,
    message: String,
    article_id: i64,
    status: Classification,
}

async fn submit_article(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let Json(req) = payload?;
    let outcome = state
        .router
        .submit(&req.url, &req.submitted_by, req.pasted_text.as_deref())
        .await?;
    let message = match outcome.classification {
        Classification::Pending => "Article submitted successfully",
        Classification::Manual => "Article requires manual processing and was added to the manual queue",
    };
    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            success: true,
            message: message.to_string(),
            article_id: outcome.id,
            status: outcome.classification,
        }),
    ))
}

async fn list_pending(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let items = state.store.list_pending().await?;
    Ok(Json(json!(items)))
}

async fn process_article(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let preview = state.reports.process_pending_item(id).await?;
    Ok(Json(json!(preview)))
}

// ============ Manual articles ============

async fn list_manual(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let items = state.store.list_manual().await?;
    Ok(Json(json!(items)))
}

#[derive(Deserialize)]
struct ManualContentRequest {
    article_content: String,
}

async fn update_manual(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<ManualContentRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let content = sanitize_text(&req.article_content)?;
    if content.is_empty() {
        return Err(AppError::invalid("Article content is required"));
    }
    if !state.store.update_manual_content(id, &content).await? {
        return Err(MonitorError::not_found("Manual article", id).into());
    }
    Ok(Json(json!({ "success": true, "message": "Article content updated", "article_id": id })))
}

async fn delete_manual(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    if !state.store.delete_manual(id).await? {
        return Err(MonitorError::not_found("Manual article", id).into());
    }
    Ok(Json(json!({ "success": true, "message": "Article deleted", "article_id": id })))
}

#[derive(Deserialize, Default)]
struct RecipientRequest {
    #[serde(default)]
    recipient_email: Option<String>,
}

async fn process_manual_batch(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Value>> {
    let req: RecipientRequest = optional_body(&body)?;
    let outcome = state.reports.process_manual_batch(recipient(req.recipient_email)?).await?;
    Ok(Json(json!(outcome)))
}

// ============ Reports ============

#[derive(Deserialize, Default)]
struct MediaReportRequest {
    #[serde(default)]
    pasted_content: Option<String>,
    #[serde(default)]
    recipient_email: Option<String>,
}

#[derive(Serialize)]
struct ReportAccepted {
    report_id: String,
    status: &'static str,
    message: &'static str,
}

async fn start_media_report(State(state): State<AppState>, body: Bytes) -> ApiResult<(StatusCode, Json<ReportAccepted>)> {
    let req: MediaReportRequest = optional_body(&body)?;
    let pasted = match req.pasted_content.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(text) => Some(sanitize_text(text)?),
        None => None,
    };
    let recipient = recipient(req.recipient_email)?;
    let report_id = state.reports.start_media_report(pasted, recipient).await;
    Ok((
        StatusCode::ACCEPTED,
        Json(ReportAccepted {
            report_id,
            status: "pending",
            message: "Media report generation started",
        }),
    ))
}

async fn start_hansard_report(State(state): State<AppState>, body: Bytes) -> ApiResult<(StatusCode, Json<ReportAccepted>)> {
    let req: RecipientRequest = optional_body(&body)?;
    let report_id = state.reports.start_hansard_report(recipient(req.recipient_email)?).await;
    Ok((
        StatusCode::ACCEPTED,
        Json(ReportAccepted {
            report_id,
            status: "pending",
            message: "Hansard report generation started",
        }),
    ))
}

async fn report_status(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let run = state.reports.status().get(&id).await?;
    Ok(Json(json!(run)))
}

async fn clear_report_status(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    state.reports.status().clear(&id).await?;
    Ok(Json(json!({ "success": true, "message": "Report status cleared", "report_id": id })))
}

#[derive(Deserialize)]
struct RecentQuery {
    limit: Option<u32>,
}

async fn recent_questions(
    State(state): State<AppState>,
    query: std::result::Result<Query<RecentQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let records = state.reports.recent_questions(query.limit).await?;
    Ok(Json(json!(records)))
}

// ============ Misc ============

async fn csrf_token() -> Json<Value> {
    let mut bytes = Vec::with_capacity(32);
    bytes.extend_from_slice(Uuid::new_v4().as_bytes());
    bytes.extend_from_slice(Uuid::new_v4().as_bytes());
    Json(json!({ "csrf_token": URL_SAFE_NO_PAD.encode(bytes) }))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "version": env!("CARGO_PKG_VERSION"),
                "config": state.config.masked(),
            })),
        ),
        Err(e) => {
            error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "database": "unavailable",
                    "version": env!("CARGO_PKG_VERSION"),
                })),
            )
        }
    }
}

async fn health_simple() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
