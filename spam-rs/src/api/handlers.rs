//! API request handlers

use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::api::history::{History, HistoryEntry};
use crate::api::metrics::Metrics;
use crate::config::Config;
use crate::error::SpamError;
use crate::ocr::decode_image_payload;
use crate::spam::{
    validate_rows, ClassificationResult, ModelInfo, RawTrainingRow, RetrainMode, SpamManager,
    TrainingReport,
};

/// Default number of history entries returned
const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Shared application state
pub struct AppState {
    pub manager: Arc<SpamManager>,
    pub history: History,
    pub metrics: Metrics,
    pub ocr_timeout: Duration,
}

impl AppState {
    pub fn new(manager: Arc<SpamManager>, config: &Config) -> Self {
        Self {
            manager,
            history: History::new(config.server.history_capacity),
            metrics: Metrics::new(),
            ocr_timeout: Duration::from_secs(config.ocr.timeout_secs),
        }
    }
}

/// Text analysis request; `emailText` is accepted as an alias of `text`
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: Option<String>,
    #[serde(rename = "emailText")]
    pub email_text: Option<String>,
    pub threshold: Option<f64>,
}

impl AnalyzeRequest {
    /// First non-blank of `emailText` and `text`
    fn input_text(&self) -> String {
        [&self.email_text, &self.text]
            .into_iter()
            .flatten()
            .find(|text| !text.trim().is_empty())
            .cloned()
            .unwrap_or_default()
    }
}

/// Image analysis request: base64 image, optionally as a data URL
#[derive(Debug, Deserialize)]
pub struct AnalyzeImageRequest {
    pub image: Option<String>,
    pub threshold: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RetrainRequest {
    pub training_data: Vec<RawTrainingRow>,
    /// Replace the stored corpus instead of appending to it
    #[serde(default)]
    pub replace: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Classification response
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub is_spam: bool,
    pub confidence: f64,
    pub threshold: f64,
    pub keywords: Vec<String>,
    pub text: String,
    pub prediction: String,
}

impl From<ClassificationResult> for AnalyzeResponse {
    fn from(result: ClassificationResult) -> Self {
        Self {
            prediction: result.label().as_str().to_string(),
            is_spam: result.is_spam,
            confidence: result.spam_probability,
            threshold: result.threshold,
            keywords: result.keywords,
            text: result.normalized_text,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeImageResponse {
    #[serde(flatten)]
    pub analysis: AnalyzeResponse,
    pub extracted_text: String,
    pub source: String,
    pub processing_notes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RetrainResponse {
    pub message: String,
    #[serde(flatten)]
    pub report: TrainingReport,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_analyzed: u64,
    pub spam_count: u64,
    pub ham_count: u64,
    pub spam_ratio: f64,
    pub model_threshold: f64,
    pub vocabulary_size: usize,
    pub requests_total: u64,
    pub errors_total: u64,
    pub uptime_secs: u64,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

impl ApiError {
    pub fn new(msg: &str) -> Self {
        Self {
            error: msg.to_string(),
            details: None,
            extracted_text: None,
            suggestions: None,
        }
    }
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

/// Map a domain error to its HTTP status and body
pub fn error_response(err: SpamError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        SpamError::OcrEngineUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        SpamError::OcrTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!(error = %err, status = status.as_u16(), "Request failed");
    } else {
        warn!(error = %err, status = status.as_u16(), "Request rejected");
    }

    let body = match err {
        SpamError::NoTextExtracted { suggestions } => ApiError {
            extracted_text: Some(String::new()),
            suggestions: Some(suggestions),
            ..ApiError::new("No text could be extracted from the image")
        },
        SpamError::ClassificationFailed(_) | SpamError::Io(_) | SpamError::Json(_) => ApiError {
            details: Some(err.to_string()),
            ..ApiError::new("Internal server error")
        },
        other => ApiError::new(&other.to_string()),
    };

    (status, Json(body))
}

/// Run blocking core work off the async runtime
async fn run_blocking<T, F>(task: F) -> Result<T, SpamError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SpamError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| SpamError::ClassificationFailed(format!("worker task failed: {}", e)))?
}

/// Counts requests and error responses
pub async fn track_metrics(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    state.metrics.inc_requests();
    let response = next.run(req).await;
    if response.status().is_client_error() || response.status().is_server_error() {
        state.metrics.inc_errors();
    }
    response
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let info = state.manager.model_info();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "message": "Spam detection API is running",
            "service": "spam-rs",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": Utc::now().to_rfc3339(),
            "checks": {
                "model": if info.vocabulary_size > 0 { "ok" } else { "empty" },
            }
        })),
    )
}

/// POST /api/analyze - classify a text
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> ApiResult<AnalyzeResponse> {
    let text = req.input_text();

    let result = state
        .manager
        .classify_text(&text, req.threshold)
        .map_err(error_response)?;

    info!(
        is_spam = result.is_spam,
        confidence = result.spam_probability,
        text_length = text.len(),
        "Analyzed text"
    );
    state.metrics.record_analysis(&result);
    state.history.record(HistoryEntry::new("text", &result)).await;

    Ok(Json(result.into()))
}

/// POST /api/analyze-image - OCR an image, then classify its text
pub async fn analyze_image(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeImageRequest>,
) -> ApiResult<AnalyzeImageResponse> {
    let payload = req
        .image
        .ok_or_else(|| SpamError::InvalidImage("no image provided".to_string()))
        .map_err(error_response)?;
    let bytes = decode_image_payload(&payload).map_err(error_response)?;
    state.metrics.inc_ocr_requests();

    let manager = state.manager.clone();
    let threshold = req.threshold;
    let task = run_blocking(move || manager.classify_image(&bytes, threshold));
    let classification = match tokio::time::timeout(state.ocr_timeout, task).await {
        Ok(result) => result,
        Err(_) => Err(SpamError::OcrTimeout(state.ocr_timeout.as_secs())),
    }
    .map_err(error_response)?;

    let mut processing_notes = vec![format!("best strategy: {}", classification.ocr.strategy)];
    processing_notes.extend(classification.ocr.failures.iter().cloned());
    if classification.ocr.raw_text != classification.ocr.cleaned_text {
        processing_notes.push("OCR error correction applied".to_string());
    }

    state.metrics.record_analysis(&classification.result);
    state
        .history
        .record(HistoryEntry::new(&classification.source, &classification.result))
        .await;

    Ok(Json(AnalyzeImageResponse {
        analysis: classification.result.into(),
        extracted_text: classification.ocr.raw_text,
        source: classification.source,
        processing_notes,
    }))
}

/// POST /api/retrain - add training rows (or replace the corpus) and retrain
pub async fn retrain(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RetrainRequest>,
) -> ApiResult<RetrainResponse> {
    let rows = validate_rows(req.training_data).map_err(error_response)?;
    let mode = if req.replace {
        RetrainMode::Replace
    } else {
        RetrainMode::Append
    };

    let manager = state.manager.clone();
    let report = run_blocking(move || manager.retrain(rows, mode))
        .await
        .map_err(error_response)?;
    state.metrics.inc_retrains();

    Ok(Json(RetrainResponse {
        message: "Model retrained successfully".to_string(),
        report,
    }))
}

/// GET /api/history?limit=N - most recent analyses first
pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<HistoryEntry>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Json(state.history.recent(limit).await)
}

/// GET /api/stats
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let metrics = &state.metrics;
    let info = state.manager.model_info();
    let total = metrics.analyses();
    let spam = metrics.spam_detected();

    Json(StatsResponse {
        total_analyzed: total,
        spam_count: spam,
        ham_count: metrics.ham_detected(),
        spam_ratio: if total > 0 { spam as f64 / total as f64 } else { 0.0 },
        model_threshold: info.threshold,
        vocabulary_size: info.vocabulary_size,
        requests_total: metrics.requests(),
        errors_total: metrics.errors(),
        uptime_secs: metrics.uptime_seconds(),
    })
}

/// GET /api/model
pub async fn model_info(State(state): State<Arc<AppState>>) -> Json<ModelInfo> {
    Json(state.manager.model_info())
}

/// GET /metrics - Prometheus metrics endpoint
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        state.metrics.to_prometheus(),
    )
}
