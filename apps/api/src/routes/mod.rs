pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::chat::handlers as chat_handlers;
use crate::resume::handlers as resume_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Chat API
        .route("/api/v1/chat", post(chat_handlers::chat))
        // Resume API
        .route("/api/v1/resumes/upload", post(resume_handlers::upload))
        .route("/api/v1/resumes/confirm", post(resume_handlers::confirm))
        .with_state(state)
}
