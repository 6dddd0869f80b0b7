//! Axum route handlers for the chat API.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;
use uuid::Uuid;

use crate::assistant::pipeline::{AssistantOutcome, ChatInput};
use crate::chat::stream::stream_turn;
use crate::errors::AppError;
use crate::state::AppState;

const STREAM_BUFFER: usize = 32;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatStreamRequest {
    #[serde(flatten)]
    pub input: ChatInput,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    #[serde(flatten)]
    pub outcome: AssistantOutcome,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ChatResponse {
    pub fn success(outcome: AssistantOutcome, session_id: Option<String>) -> Self {
        Self {
            outcome,
            status: "success",
            session_id,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /chat
///
/// Runs one assistant turn and returns the whole result at once.
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(input): Json<ChatInput>,
) -> Result<Json<ChatResponse>, AppError> {
    validate_query(&input.query)?;

    let outcome = state.assistant.run(&input).await;
    info!("Chat turn finished in {:?} mode", outcome.mode);

    Ok(Json(ChatResponse::success(outcome, None)))
}

/// POST /chat/stream
///
/// Same turn as `/chat`, delivered as server-sent events.
pub async fn handle_chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatStreamRequest>,
) -> Result<Sse<ReceiverStream<Result<Event, Infallible>>>, AppError> {
    validate_query(&request.input.query)?;

    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    info!("Chat stream opened: session {session_id}");

    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    tokio::spawn(stream_turn(
        state.assistant.clone(),
        request.input,
        session_id,
        Duration::from_millis(state.config.stream_heartbeat_ms),
        tx,
    ));

    Ok(Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default()))
}

fn validate_query(query: &str) -> Result<(), AppError> {
    if query.trim().is_empty() {
        return Err(AppError::Validation("query cannot be empty".to_string()));
    }
    Ok(())
}
