//! HTTP surface for resume upload and confirm-save.
//!
//! Upload is multipart (`file` plus optional `session_id`/`query`/`stream`
//! fields) and goes through the dispatcher like any other turn, with the
//! document attached. Confirm is plain JSON and invokes the save tool
//! directly — its intent is unambiguous.

use axum::extract::{Multipart, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::chat::dispatch::{self, UploadedDocument};
use crate::chat::handlers::{reply_response, ChatResponse};
use crate::errors::AppError;
use crate::state::AppState;

const DEFAULT_UPLOAD_QUERY: &str = "I've uploaded a resume, please summarize it.";

/// POST /api/v1/resumes/upload (multipart/form-data)
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut document: Option<UploadedDocument> = None;
    let mut session_id: Option<String> = None;
    let mut query: Option<String> = None;
    let mut stream = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let media_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read file: {e}")))?;
                document = Some(UploadedDocument { bytes, media_type });
            }
            "session_id" => {
                session_id = Some(read_text_field(field).await?);
            }
            "query" => {
                query = Some(read_text_field(field).await?);
            }
            "stream" => {
                stream = read_text_field(field).await?.trim() == "true";
            }
            other => {
                tracing::debug!("Ignoring unknown multipart field {other:?}");
            }
        }
    }

    let document =
        document.ok_or_else(|| AppError::Validation("missing 'file' field".to_string()))?;
    if document.bytes.is_empty() {
        return Err(AppError::Validation("uploaded file is empty".to_string()));
    }

    let session_id = state.sessions.ensure(session_id);
    let query = query.unwrap_or_else(|| DEFAULT_UPLOAD_QUERY.to_string());

    let reply = dispatch::route(&state, &session_id, &query, stream, Some(document)).await?;
    Ok(reply_response(session_id, reply))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart field: {e}")))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub session_id: String,
}

/// POST /api/v1/resumes/confirm
pub async fn confirm(
    State(state): State<AppState>,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let session_id = state.sessions.ensure(Some(request.session_id));
    state.sessions.append_user(&session_id, "Save the uploaded resume.");

    let reply = crate::resume::resume_confirm_save_tool(&state, &session_id).await?;
    let reply = reply
        .into_text()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("confirm-save produced a stream")))?;
    Ok(Json(ChatResponse { session_id, reply }))
}
