//! REST API Server for the intent chatbot
//!
//! Exposes chat, conversation history and model details over HTTP

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::spawn_blocking;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::chat_log::ChatLog;
use crate::conversational::Chatbot;
use crate::error::ChatbotError;
use crate::session::{InMemorySessionStore, SessionStore};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub chatbot: Arc<Chatbot>,
    pub sessions: Arc<dyn SessionStore>,
    pub chat_log: ChatLog,
}

/// =============================
/// Helpers — Session Ids
/// =============================

fn stable_uuid_from_string(input: &str) -> uuid::Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    uuid::Uuid::from_bytes(bytes)
}

/// Client-supplied ids that are not UUIDs map to a stable UUID; absent ids get a fresh one
fn resolve_session_id(value: Option<&str>) -> uuid::Uuid {
    match value {
        Some(v) if !v.trim().is_empty() => {
            uuid::Uuid::parse_str(v).unwrap_or_else(|_| stable_uuid_from_string(v))
        }
        _ => uuid::Uuid::new_v4(),
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    if req.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Message must not be empty".into())),
        );
    }

    let session_id = resolve_session_id(req.session_id.as_deref());

    // Classification and the log append are synchronous
    let chatbot = Arc::clone(&state.chatbot);
    let chat_log = state.chat_log.clone();
    let message = req.message.clone();
    let reply = match spawn_blocking(move || {
        let mut rng = rand::thread_rng();
        chatbot.chat(&message, &mut rng, Some(&chat_log))
    })
    .await
    {
        Ok(reply) => reply,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Chat task failed: {}", e))),
            )
        }
    };

    info!(
        session_id = %session_id,
        tag = ?reply.tag,
        "Answered chat message"
    );

    if let Err(e) = state
        .sessions
        .record_exchange(session_id, &req.message, &reply.answer)
        .await
    {
        warn!("Session history update failed, reply will still be returned: {}", e);
    }

    let mut data = serde_json::json!({
        "answer": reply.answer,
        "tag": reply.tag,
        "session_id": session_id.to_string(),
    });
    if let Some(warning) = reply.log_warning {
        data["log_warning"] = serde_json::json!(warning);
    }

    (StatusCode::OK, Json(ApiResponse::success(data)))
}

/// =============================
/// Conversation History Endpoint
/// =============================

async fn history_handler(State(state): State<ApiState>) -> (StatusCode, Json<ApiResponse>) {
    let chat_log = state.chat_log.clone();
    let entries = spawn_blocking(move || chat_log.read_all())
        .await
        .map_err(|e| ChatbotError::LogError(format!("History task failed: {}", e)))
        .and_then(|result| result);

    match entries {
        Ok(entries) => (StatusCode::OK, Json(ApiResponse::success(entries))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to read chat log: {}", e))),
        ),
    }
}

/// =============================
/// Session Endpoint
/// =============================

async fn sessions_handler(State(state): State<ApiState>) -> (StatusCode, Json<ApiResponse>) {
    match state.sessions.session_ids().await {
        Ok(ids) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                ids.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
            )),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(e.to_string())),
        ),
    }
}

async fn session_handler(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let session_id = resolve_session_id(Some(session_id.as_str()));

    match state.sessions.load(session_id).await {
        Ok(session) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "session_id": session.session_id.to_string(),
                "messages": session.messages().collect::<Vec<_>>(),
                "latest": session.latest_exchange(),
            }))),
        ),
        Err(e @ ChatbotError::SessionNotFound(_)) => {
            (StatusCode::NOT_FOUND, Json(ApiResponse::error(e.to_string())))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(e.to_string())),
        ),
    }
}

/// =============================
/// About Endpoint
/// =============================

async fn about_handler(State(state): State<ApiState>) -> Json<ApiResponse> {
    let catalog = state.chatbot.catalog();
    let classifier = state.chatbot.classifier();
    let (min_n, max_n) = classifier.ngram_range();

    Json(ApiResponse::success(serde_json::json!({
        "model": "one-vs-rest logistic regression",
        "features": "tf-idf word n-grams",
        "ngram_range": [min_n, max_n],
        "vocabulary_size": classifier.vocabulary_size(),
        "intent_count": catalog.len(),
        "tags": catalog.tags().collect::<Vec<_>>(),
    })))
}

/// =============================
/// Router
/// =============================

pub fn create_router(chatbot: Arc<Chatbot>, chat_log: ChatLog) -> Router {
    create_router_with_sessions(chatbot, chat_log, Arc::new(InMemorySessionStore::new()))
}

pub fn create_router_with_sessions(
    chatbot: Arc<Chatbot>,
    chat_log: ChatLog,
    sessions: Arc<dyn SessionStore>,
) -> Router {
    let state = ApiState {
        chatbot,
        sessions,
        chat_log,
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat_handler))
        .route("/api/history", get(history_handler))
        .route("/api/sessions", get(sessions_handler))
        .route("/api/sessions/:session_id", get(session_handler))
        .route("/api/about", get(about_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    chatbot: Arc<Chatbot>,
    chat_log: ChatLog,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(chatbot, chat_log);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
