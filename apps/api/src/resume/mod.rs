//! Resume tools — upload-and-summarize, and the explicit confirm-save step.
//!
//! Upload never writes to the database. It extracts the document's text,
//! stages it on the session, and replies with a summary that asks whether to
//! save. Persistence happens only when the user confirms and the
//! confirm-save tool runs.

pub mod extract;
pub mod handlers;
pub mod prompts;

use serde::Deserialize;

use crate::chat::dispatch::ToolReply;
use crate::chat::stream::accumulate_into_memory;
use crate::errors::AppError;
use crate::llm_client::call_json;
use crate::models::resume::ResumeRow;
use crate::state::AppState;
use self::extract::extract_text;
use self::prompts::{
    CANDIDATE_EXTRACT_PROMPT_TEMPLATE, CANDIDATE_EXTRACT_SYSTEM, SUMMARY_PROMPT_TEMPLATE,
    SUMMARY_SYSTEM,
};

/// Fixed reply when confirm-save runs with nothing staged.
pub const NO_PENDING_MESSAGE: &str =
    "No resume is pending. Upload a resume first, then ask me to save it.";

/// Structured fields pulled out of staged resume text for persistence.
#[derive(Debug, Deserialize)]
pub struct CandidateFields {
    pub candidate_name: Option<String>,
    pub employee_email: Option<String>,
    pub phone: Option<String>,
    pub skills: Option<String>,
}

/// Extracts the document text, stages it on the session, and summarizes it.
/// No database writes happen here.
pub async fn resume_upload_tool(
    state: &AppState,
    session_id: &str,
    bytes: &[u8],
    media_type: &str,
    stream: bool,
) -> Result<ToolReply, AppError> {
    let text = extract_text(bytes, media_type)?;
    tracing::info!(
        "Extracted {} chars of resume text for session {session_id}",
        text.len()
    );
    state.sessions.stage_resume(session_id, text.clone());

    let prompt = SUMMARY_PROMPT_TEMPLATE.replace("{resume_text}", &text);

    if stream {
        let fragments = state
            .llm
            .generate_stream(&prompt, SUMMARY_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Resume summarization failed: {e}")))?;
        Ok(ToolReply::Stream(accumulate_into_memory(
            fragments,
            state.sessions.clone(),
            session_id.to_string(),
        )))
    } else {
        let summary = state
            .llm
            .generate(&prompt, SUMMARY_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Resume summarization failed: {e}")))?;
        state.sessions.append_assistant(session_id, &summary);
        Ok(ToolReply::Text(summary))
    }
}

/// Persists the staged resume: structured field extraction, one INSERT, then
/// the staged text is cleared. With nothing staged this is a fixed reply, not
/// an error.
pub async fn resume_confirm_save_tool(
    state: &AppState,
    session_id: &str,
) -> Result<ToolReply, AppError> {
    let Some(raw_text) = state.sessions.pending_resume(session_id) else {
        return Ok(ToolReply::Text(NO_PENDING_MESSAGE.to_string()));
    };

    let prompt = CANDIDATE_EXTRACT_PROMPT_TEMPLATE.replace("{resume_text}", &raw_text);
    let fields: CandidateFields = call_json(state.llm.as_ref(), &prompt, CANDIDATE_EXTRACT_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("Candidate field extraction failed: {e}")))?;

    let saved: ResumeRow = sqlx::query_as(
        "INSERT INTO resumes (employee_email, candidate_name, phone, skills, raw_text) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, employee_email, candidate_name, phone, skills, raw_text, created_at",
    )
    .bind(&fields.employee_email)
    .bind(&fields.candidate_name)
    .bind(&fields.phone)
    .bind(&fields.skills)
    .bind(&raw_text)
    .fetch_one(&state.db)
    .await?;

    state.sessions.clear_pending_resume(session_id);
    tracing::info!("Saved resume {} for session {session_id}", saved.id);

    let candidate = saved
        .candidate_name
        .as_deref()
        .unwrap_or("the candidate")
        .to_string();
    let ack = format!("Saved the resume for {candidate} (record #{}).", saved.id);
    state.sessions.append_assistant(session_id, &ack);
    Ok(ToolReply::Text(ack))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::memory::SessionStore;
    use crate::config::Config;
    use crate::llm_client::testing::ScriptedGateway;
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
    async fn test_upload_stages_text_and_replies_with_summary() {
        // The lazy pool has no live connection; any database access here
        // would fail, so success also proves upload never touches the pool.
        let state = test_state(&["Strong Rust candidate. Save to database?"]);
        let reply = resume_upload_tool(
            &state,
            "s",
            b"Jane Doe, Rust engineer, jane@example.com",
            "text/plain",
            false,
        )
        .await
        .unwrap();

        assert_eq!(
            reply.into_text().unwrap(),
            "Strong Rust candidate. Save to database?"
        );
        assert!(state
            .sessions
            .pending_resume("s")
            .unwrap()
            .contains("Jane Doe"));
    }

    #[tokio::test]
    async fn test_upload_summary_lands_in_memory() {
        let state = test_state(&["Summary of the resume."]);
        let _ = resume_upload_tool(&state, "s", b"some resume", "text/plain", false)
            .await
            .unwrap();
        assert!(state
            .sessions
            .transcript("s")
            .contains("Assistant: Summary of the resume."));
    }

    #[tokio::test]
    async fn test_upload_rejects_unreadable_document() {
        let state = test_state(&[]);
        let result = resume_upload_tool(
            &state,
            "s",
            &[0xFFu8, 0xFE, 0x00],
            "application/octet-stream",
            false,
        )
        .await;
        assert!(matches!(result, Err(AppError::Extraction(_))));
        assert!(state.sessions.pending_resume("s").is_none());
    }

    #[tokio::test]
    async fn test_confirm_without_pending_is_a_fixed_reply() {
        let state = test_state(&[]);
        let reply = resume_confirm_save_tool(&state, "s").await.unwrap();
        assert_eq!(reply.into_text().unwrap(), NO_PENDING_MESSAGE);
    }

    #[test]
    fn test_candidate_fields_deserialize_with_nulls() {
        let fields: CandidateFields = serde_json::from_str(
            r#"{"candidate_name":"Jane Doe","employee_email":null,"phone":null,"skills":"Rust, SQL"}"#,
        )
        .unwrap();
        assert_eq!(fields.candidate_name.as_deref(), Some("Jane Doe"));
        assert!(fields.employee_email.is_none());
        assert_eq!(fields.skills.as_deref(), Some("Rust, SQL"));
    }
}
