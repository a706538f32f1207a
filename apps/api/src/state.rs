use std::sync::Arc;

use sqlx::PgPool;

use crate::chat::memory::SessionStore;
use crate::config::Config;
use crate::llm_client::LlmGateway;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Pluggable text generation gateway. Production: `GeminiClient`.
    /// Tests swap in a scripted fake.
    pub llm: Arc<dyn LlmGateway>,
    /// In-process conversation sessions, one bounded memory per conversation.
    /// Not persisted across restarts.
    pub sessions: SessionStore,
    pub config: Config,
}
