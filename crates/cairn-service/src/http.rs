//! The axum HTTP surface (spec §6: "HTTP API (selected endpoints, exact shapes)").

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use cairn_core::{SessionId, Turn};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::facade::CairnService;

pub fn router(service: Arc<CairnService>) -> Router {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(end_session))
        .route("/sessions/{id}/extend", post(extend_session))
        .route("/chat", post(chat))
        .route("/chat-config", get(get_chat_config).post(set_chat_config))
        .with_state(service)
}

#[derive(Serialize)]
struct SessionResponse {
    session_id: Uuid,
    created_at: DateTime<Utc>,
    remaining_time: i64,
    timeout_minutes: u64,
}

/// `conversation_history` is a one-time seed for the session's rolling window (spec's
/// resolved Open Question); omitted or empty means a session with no prior turns, exactly
/// as before this field existed.
#[derive(Deserialize, Default)]
struct CreateSessionBody {
    #[serde(default)]
    conversation_history: Vec<Turn>,
}

async fn create_session(
    State(service): State<Arc<CairnService>>,
    body: Option<Json<CreateSessionBody>>,
) -> Json<SessionResponse> {
    let history = body.map(|Json(b)| b.conversation_history).unwrap_or_default();
    let record = service.create_session_with_history(history);
    Json(SessionResponse {
        session_id: record.id.into(),
        created_at: record.created_at,
        remaining_time: record.remaining_seconds,
        timeout_minutes: record.timeout_minutes,
    })
}

async fn get_session(
    State(service): State<Arc<CairnService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let record = service.session_info(SessionId::from(id)).await.map_err(ApiError::sessions)?;
    Ok(Json(SessionResponse {
        session_id: record.id.into(),
        created_at: record.created_at,
        remaining_time: record.remaining_seconds,
        timeout_minutes: record.timeout_minutes,
    }))
}

#[derive(Serialize)]
struct ExtendResponse {
    message: &'static str,
    remaining_time: i64,
}

async fn extend_session(
    State(service): State<Arc<CairnService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExtendResponse>, ApiError> {
    let remaining_time = service.extend_session(SessionId::from(id)).await.map_err(ApiError::sessions)?;
    Ok(Json(ExtendResponse { message: "session extended", remaining_time }))
}

async fn end_session(State(service): State<Arc<CairnService>>, Path(id): Path<Uuid>) -> axum::http::StatusCode {
    service.end_session(SessionId::from(id));
    axum::http::StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
struct ChatRequestBody {
    message: String,
    session_id: Uuid,
}

#[derive(Serialize)]
struct ChatResponseBody {
    answer: String,
    sources: Vec<String>,
    metrics: serde_json::Value,
    generated_by: &'static str,
}

async fn chat(
    State(service): State<Arc<CairnService>>,
    Json(body): Json<ChatRequestBody>,
) -> Result<Json<ChatResponseBody>, ApiError> {
    let outcome = service
        .ask(SessionId::from(body.session_id), &body.message)
        .await
        .map_err(ApiError::chat)?;
    Ok(Json(ChatResponseBody {
        answer: outcome.answer,
        sources: outcome.sources,
        metrics: outcome.metrics,
        generated_by: outcome.generated_by,
    }))
}

async fn get_chat_config(State(service): State<Arc<CairnService>>) -> Json<crate::config::CairnConfig> {
    Json(service.config_snapshot().await)
}

async fn set_chat_config(
    State(service): State<Arc<CairnService>>,
    Json(cfg): Json<crate::config::CairnConfig>,
) -> Result<Json<crate::config::CairnConfig>, ApiError> {
    service.set_config(cfg.clone()).await.map_err(ApiError::sessions)?;
    Ok(Json(cfg))
}
