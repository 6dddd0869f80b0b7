//! Event producer for `/chat/stream`.
//!
//! Order on the wire: `status` "Thinking...", `status` "Searching..." (repeated
//! every heartbeat while the turn runs), `token` chunks of the answer, then one
//! `final` event carrying the JSON payload.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::Event;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tracing::{debug, error};

use crate::assistant::pipeline::{Assistant, ChatInput};
use crate::chat::handlers::ChatResponse;

/// Characters per `token` event.
pub const TOKEN_CHUNK_CHARS: usize = 18;

const MIN_HEARTBEAT: Duration = Duration::from_millis(1);

pub type EventSender = mpsc::Sender<Result<Event, Infallible>>;

/// Splits `text` into pieces of at most `size` characters.
pub fn chunk_answer(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Rewrites CRLF and bare CR line endings as LF.
///
/// SSE data cannot carry carriage returns, so the streamed tokens and the
/// `final` payload both use the normalized text.
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn status_event(message: &str) -> Event {
    Event::default().event("status").data(message)
}

fn token_event(chunk: &str) -> Event {
    // multi-line data is split into several `data:` lines by the encoder
    Event::default().event("token").data(chunk)
}

fn error_event(detail: &str) -> Event {
    Event::default()
        .event("final")
        .data(json!({ "status": "error", "detail": detail }).to_string())
}

fn final_event(payload: &ChatResponse) -> Event {
    match Event::default().event("final").json_data(payload) {
        Ok(event) => event,
        Err(e) => {
            error!("Failed to encode final chat payload: {e}");
            error_event(&e.to_string())
        }
    }
}

/// Runs one chat turn and feeds its events into `tx`.
///
/// The turn runs on its own task; if the client goes away the task is aborted.
pub async fn stream_turn(
    assistant: Assistant,
    input: ChatInput,
    session_id: String,
    heartbeat: Duration,
    tx: EventSender,
) {
    if send(&tx, status_event("Thinking...")).await.is_err()
        || send(&tx, status_event("Searching...")).await.is_err()
    {
        return;
    }

    let mut turn = tokio::spawn(async move { assistant.run(&input).await });

    let heartbeat = heartbeat.max(MIN_HEARTBEAT);
    let mut ticker = interval_at(Instant::now() + heartbeat, heartbeat);

    let joined = loop {
        tokio::select! {
            joined = &mut turn => break joined,
            _ = ticker.tick() => {
                if send(&tx, status_event("Searching...")).await.is_err() {
                    debug!("Chat stream {session_id} closed by client, aborting turn");
                    turn.abort();
                    return;
                }
            }
        }
    };

    let mut outcome = match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Chat stream {session_id} failed: {e}");
            let _ = send(&tx, error_event(&e.to_string())).await;
            return;
        }
    };

    outcome.final_answer = normalize_newlines(&outcome.final_answer);
    for chunk in chunk_answer(&outcome.final_answer, TOKEN_CHUNK_CHARS) {
        if send(&tx, token_event(&chunk)).await.is_err() {
            return;
        }
    }

    let payload = ChatResponse::success(outcome, Some(session_id));
    let _ = send(&tx, final_event(&payload)).await;
}

async fn send(tx: &EventSender, event: Event) -> Result<(), ()> {
    tx.send(Ok(event)).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_are_eighteen_chars() {
        let text = "a".repeat(40);
        let chunks = chunk_answer(&text, TOKEN_CHUNK_CHARS);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 18);
        assert_eq!(chunks[2].len(), 4);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_chunks_respect_char_boundaries() {
        let text = "नमस्ते दुनिया, आपके लिए नौकरियाँ";
        let chunks = chunk_answer(text, 5);
        assert!(chunks.iter().all(|c| c.chars().count() <= 5));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_line_endings_are_normalized_to_lf() {
        assert_eq!(normalize_newlines("a\r\nb\rc\nd"), "a\nb\nc\nd");
        assert_eq!(normalize_newlines("\r\n\r\n"), "\n\n");
        assert_eq!(normalize_newlines("plain"), "plain");
    }

    #[test]
    fn test_crlf_answer_chunks_rejoin_to_normalized_text() {
        let answer = normalize_newlines("Top roles for you:\r\n1. Backend Engineer\r\n2. SRE\r");
        let chunks = chunk_answer(&answer, TOKEN_CHUNK_CHARS);
        assert!(chunks.iter().all(|c| !c.contains('\r')));
        assert_eq!(chunks.concat(), "Top roles for you:\n1. Backend Engineer\n2. SRE\n");
    }

    #[test]
    fn test_empty_answer_has_no_chunks() {
        assert!(chunk_answer("", TOKEN_CHUNK_CHARS).is_empty());
    }
}
