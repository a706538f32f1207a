//! Tool dispatch — the single entry point for one conversation turn.
//!
//! One user message triggers a strictly sequential chain: record the turn,
//! classify it (one LLM call), invoke the selected tool handler. Every
//! outcome is a typed `ToolReply` or `AppError`; routing failure is a fixed
//! text result, not an error.

use bytes::Bytes;

use crate::chat::prompts::GREETING_SYSTEM;
use crate::chat::router::{classify, ToolDecision};
use crate::chat::stream::accumulate_into_memory;
use crate::errors::AppError;
use crate::llm_client::TextStream;
use crate::query::db_query_tool;
use crate::resume::{resume_confirm_save_tool, resume_upload_tool};
use crate::state::AppState;

/// Fixed refusal for out-of-scope messages. Returned verbatim.
pub const GENERAL_REFUSAL: &str =
    "I don't have permission to answer that. I can only help with the employee database and resumes.";

/// Returned when an upload intent arrives without a file payload.
pub const NO_FILE_MESSAGE: &str =
    "No file provided. Please attach a resume (PDF or text) and try again.";

/// Returned when the router could not map the message to any tool.
pub const UNROUTABLE_MESSAGE: &str =
    "Sorry, I could not work out how to handle that request. Try rephrasing it.";

/// A document attached to the current turn.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub bytes: Bytes,
    pub media_type: String,
}

/// The result of one turn: a complete text answer or a lazy fragment stream.
pub enum ToolReply {
    Text(String),
    Stream(TextStream),
}

impl ToolReply {
    pub fn into_text(self) -> Option<String> {
        match self {
            ToolReply::Text(text) => Some(text),
            ToolReply::Stream(_) => None,
        }
    }
}

/// Routes one user turn to the matching tool handler.
///
/// The user's message is appended to conversation memory before the routing
/// decision is known; the transcript passed to the router is the state prior
/// to this turn.
pub async fn route(
    state: &AppState,
    session_id: &str,
    query: &str,
    stream: bool,
    document: Option<UploadedDocument>,
) -> Result<ToolReply, AppError> {
    let history = state.sessions.transcript(session_id);
    state.sessions.append_user(session_id, query);

    let decision = classify(state.llm.as_ref(), &history, query).await?;
    tracing::info!("Routed turn for session {session_id} to {decision:?}");

    match decision {
        ToolDecision::Greeting => greeting_tool(state, session_id, query, stream).await,
        ToolDecision::General => Ok(general_tool()),
        ToolDecision::DatabaseQuery => db_query_tool(state, session_id, query, stream).await,
        ToolDecision::ResumeUpload => match document {
            Some(doc) => {
                resume_upload_tool(state, session_id, &doc.bytes, &doc.media_type, stream).await
            }
            None => Ok(ToolReply::Text(NO_FILE_MESSAGE.to_string())),
        },
        ToolDecision::ResumeConfirmSave => resume_confirm_save_tool(state, session_id).await,
        ToolDecision::Unroutable => Ok(ToolReply::Text(UNROUTABLE_MESSAGE.to_string())),
    }
}

/// Forwards the message to the gateway and records both turns in memory.
pub async fn greeting_tool(
    state: &AppState,
    session_id: &str,
    query: &str,
    stream: bool,
) -> Result<ToolReply, AppError> {
    if stream {
        let fragments = state
            .llm
            .generate_stream(query, GREETING_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Greeting failed: {e}")))?;
        Ok(ToolReply::Stream(accumulate_into_memory(
            fragments,
            state.sessions.clone(),
            session_id.to_string(),
        )))
    } else {
        let reply = state
            .llm
            .generate(query, GREETING_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Greeting failed: {e}")))?;
        state.sessions.append_assistant(session_id, &reply);
        Ok(ToolReply::Text(reply))
    }
}

/// Deny-by-default for anything the router classified as out of scope.
/// Always the fixed refusal, independent of message content.
pub fn general_tool() -> ToolReply {
    ToolReply::Text(GENERAL_REFUSAL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::memory::SessionStore;
    use crate::config::Config;
    use crate::llm_client::testing::ScriptedGateway;
    use futures::StreamExt;
    use std::sync::Arc;

    fn test_state(replies: &[&str]) -> AppState {
        AppState {
            db: sqlx::PgPool::connect_lazy("postgres://localhost/hrdesk_test")
                .expect("lazy pool"),
            llm: Arc::new(ScriptedGateway::new(replies)),
            sessions: SessionStore::new(),
            config: Config {
                database_url: String::new(),
                gemini_api_key: String::new(),
                port: 0,
                rust_log: "info".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_general_intent_yields_fixed_refusal_verbatim() {
        let state = test_state(&["TOOL: general_tool"]);
        let reply = route(&state, "s", "what's the weather?", false, None)
            .await
            .unwrap();
        assert_eq!(reply.into_text().unwrap(), GENERAL_REFUSAL);
    }

    #[tokio::test]
    async fn test_unroutable_reply_yields_fixed_message() {
        let state = test_state(&["no idea which tool"]);
        let reply = route(&state, "s", "???", false, None).await.unwrap();
        assert_eq!(reply.into_text().unwrap(), UNROUTABLE_MESSAGE);
    }

    #[tokio::test]
    async fn test_upload_intent_without_file_is_rejected() {
        let state = test_state(&["TOOL: resume_upload_tool"]);
        let reply = route(&state, "s", "here is my resume", false, None)
            .await
            .unwrap();
        assert_eq!(reply.into_text().unwrap(), NO_FILE_MESSAGE);
    }

    #[tokio::test]
    async fn test_greeting_turn_records_both_sides() {
        let state = test_state(&["TOOL: greeting_tool", "Hello! How can I help?"]);
        let reply = route(&state, "s", "hi there", false, None).await.unwrap();
        assert_eq!(reply.into_text().unwrap(), "Hello! How can I help?");

        let transcript = state.sessions.transcript("s");
        assert!(transcript.contains("User: hi there"));
        assert!(transcript.contains("Assistant: Hello! How can I help?"));
    }

    #[tokio::test]
    async fn test_streamed_greeting_accumulates_into_memory() {
        let state = test_state(&["TOOL: greeting_tool", "Good morning to you"]);
        let reply = route(&state, "s", "good morning", true, None).await.unwrap();
        let fragments = match reply {
            ToolReply::Stream(s) => s,
            ToolReply::Text(_) => panic!("expected a stream"),
        };

        let collected: String = fragments
            .map(|f| f.unwrap())
            .collect::<Vec<_>>()
            .await
            .concat();
        assert_eq!(collected, "Good morning to you");
        assert!(state
            .sessions
            .transcript("s")
            .contains("Assistant: Good morning to you"));
    }

    #[tokio::test]
    async fn test_upload_intent_with_file_reaches_the_upload_tool() {
        let state = test_state(&["TOOL: resume_upload_tool", "Summary. Save it?"]);
        let document = UploadedDocument {
            bytes: Bytes::from_static(b"Jane Doe, Rust engineer"),
            media_type: "text/plain".to_string(),
        };
        let reply = route(&state, "s", "please summarize this resume", false, Some(document))
            .await
            .unwrap();
        assert_eq!(reply.into_text().unwrap(), "Summary. Save it?");
        assert!(state.sessions.pending_resume("s").is_some());
    }

    #[tokio::test]
    async fn test_user_turn_recorded_even_when_unroutable() {
        let state = test_state(&["garbage"]);
        let _ = route(&state, "s", "lost message?", false, None).await.unwrap();
        assert!(state.sessions.transcript("s").contains("User: lost message?"));
    }
}
