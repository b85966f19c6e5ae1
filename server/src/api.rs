// server/src/api.rs

use axum::{
    debug_handler,
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response as AxumResponse},
    routing::{get, post},
    Json, Router,
};
use krishi_core::{ModelReply, QueryRequest, UserType};
use orchestrator::{Orchestrator, Outcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

pub struct AppState {
    pub orchestrator: Orchestrator,
    pub model: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoiceRequest {
    #[serde(default)]
    text: String,
    user_type: Option<String>,
    lang: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    #[serde(alias = "text")]
    message: Option<String>,
    user_type: Option<String>,
    lang: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateRequest {
    #[serde(default)]
    text: String,
    #[serde(default)]
    target_lang: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    model: String,
    price_entries: usize,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Busy(String),
    #[error("{0}")]
    Upstream(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> AxumResponse {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("[Server] Request failed: {}", self);
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/process-voice", post(process_voice_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/translate", post(translate_handler))
        .route("/api/health", get(health_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

fn query_request(text: String, user_type: Option<String>, lang: Option<String>) -> QueryRequest {
    QueryRequest {
        raw_text: text,
        user_type: user_type.as_deref().and_then(UserType::parse),
        target_language: lang,
    }
}

/// HTTP status for a resolved reply. The body is reply-shaped either way.
fn status_for(outcome: Outcome) -> StatusCode {
    match outcome {
        Outcome::LocalPrice | Outcome::ModelAnswer | Outcome::Unparseable => StatusCode::OK,
        Outcome::QuotaExceeded => StatusCode::SERVICE_UNAVAILABLE,
        Outcome::DependencyFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[debug_handler]
async fn process_voice_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VoiceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ModelReply>), ApiError> {
    let Json(payload) = payload?;
    if payload.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text is required".to_string()));
    }
    info!(
        "[Server] Voice input ({}): \"{}\"",
        payload.lang.as_deref().unwrap_or("default"),
        payload.text
    );

    let request = query_request(payload.text, payload.user_type, payload.lang);
    let resolution = state.orchestrator.resolve(&request).await;
    Ok((status_for(resolution.outcome), Json(resolution.reply)))
}

#[debug_handler]
async fn chat_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(payload) = payload?;
    let message = payload
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("message is required".to_string()))?;

    let request = query_request(message, payload.user_type, payload.lang);
    let resolution = state.orchestrator.resolve(&request).await;
    match resolution.outcome {
        Outcome::QuotaExceeded => Err(ApiError::Busy(resolution.reply.voice_response)),
        Outcome::DependencyFailure => Err(ApiError::Upstream(resolution.reply.voice_response)),
        _ => Ok(Json(ChatResponse {
            response: resolution.reply.voice_response,
        })),
    }
}

#[debug_handler]
async fn translate_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let Json(payload) = payload?;
    if payload.text.trim().is_empty() || payload.target_lang.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "text and targetLang are required".to_string(),
        ));
    }

    match state
        .orchestrator
        .translate(&payload.text, &payload.target_lang)
        .await
    {
        Ok(translated_text) => Ok(Json(TranslateResponse { translated_text })),
        Err(err) => {
            error!("[Server] Translation error: {}", err);
            Err(ApiError::Upstream("Translation Failed".to_string()))
        }
    }
}

#[debug_handler]
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model: state.model.clone(),
        price_entries: state.orchestrator.knowledge().len(),
    })
}
