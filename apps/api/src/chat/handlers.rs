//! HTTP surface for the chat endpoint.
//!
//! One-shot replies are plain JSON. Streamed replies are server-sent events:
//! a leading `session` event carrying the session id, then unnamed `data`
//! events with text fragments, and an `error` event if generation fails
//! mid-stream.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::chat::dispatch::{self, ToolReply};
use crate::errors::AppError;
use crate::llm_client::TextStream;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Omit to start a fresh conversation; the response carries the new id.
    pub session_id: Option<String>,
    pub query: String,
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
}

/// POST /api/v1/chat
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, AppError> {
    if request.query.trim().is_empty() {
        return Err(AppError::Validation("query must not be empty".to_string()));
    }

    let session_id = state.sessions.ensure(request.session_id);
    let reply = dispatch::route(&state, &session_id, &request.query, request.stream, None).await?;
    Ok(reply_response(session_id, reply))
}

/// Renders a tool reply: JSON for full text, SSE for a fragment stream.
pub fn reply_response(session_id: String, reply: ToolReply) -> Response {
    match reply {
        ToolReply::Text(reply) => Json(ChatResponse { session_id, reply }).into_response(),
        ToolReply::Stream(fragments) => sse_response(session_id, fragments).into_response(),
    }
}

fn sse_response(
    session_id: String,
    fragments: TextStream,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let head = stream::once(async move { Ok(Event::default().event("session").data(session_id)) });
    let body = fragments.map(|fragment| {
        Ok(match fragment {
            Ok(text) => Event::default().data(text),
            Err(e) => Event::default().event("error").data(e.to_string()),
        })
    });
    Sse::new(head.chain(body)).keep_alive(KeepAlive::default())
}
