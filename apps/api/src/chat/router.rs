//! Intent Router — classifies one user turn into exactly one tool.
//!
//! The gateway is asked for a single `TOOL: <name>` line. Parsing fails
//! closed: the reply must contain exactly one known tool name, otherwise the
//! turn is `Unroutable`. An imprecise model answer mentioning several tools
//! is never silently resolved by priority order.

use crate::chat::prompts::{ROUTER_PROMPT_TEMPLATE, ROUTER_SYSTEM};
use crate::errors::AppError;
use crate::llm_client::LlmGateway;
use crate::query::prompts::SCHEMA_DESCRIPTION;

/// The routing decision for one user turn. Produced once, consumed
/// immediately, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolDecision {
    Greeting,
    General,
    DatabaseQuery,
    ResumeUpload,
    ResumeConfirmSave,
    Unroutable,
}

/// The five routable tools, in menu declaration order.
const KNOWN_TOOLS: [(ToolDecision, &str); 5] = [
    (ToolDecision::Greeting, "greeting_tool"),
    (ToolDecision::General, "general_tool"),
    (ToolDecision::DatabaseQuery, "db_query_tool"),
    (ToolDecision::ResumeUpload, "resume_upload_tool"),
    (ToolDecision::ResumeConfirmSave, "resume_confirm_save_tool"),
];

/// Asks the gateway to classify the turn against the fixed tool menu.
pub async fn classify(
    gateway: &dyn LlmGateway,
    history: &str,
    query: &str,
) -> Result<ToolDecision, AppError> {
    let prompt = ROUTER_PROMPT_TEMPLATE
        .replace("{schema}", SCHEMA_DESCRIPTION)
        .replace("{history}", history)
        .replace("{query}", query);

    let reply = gateway
        .generate(&prompt, ROUTER_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("Intent routing failed: {e}")))?;

    let decision = parse_tool_decision(&reply);
    tracing::debug!("Router reply {reply:?} parsed as {decision:?}");
    Ok(decision)
}

/// Parses the model's routing reply by substring containment against the
/// known tool names. Exactly one match selects that tool; zero or multiple
/// matches fail closed to `Unroutable`.
pub fn parse_tool_decision(reply: &str) -> ToolDecision {
    let mut matched: Option<ToolDecision> = None;
    for (decision, name) in KNOWN_TOOLS {
        if reply.contains(name) {
            if matched.is_some() {
                return ToolDecision::Unroutable;
            }
            matched = Some(decision);
        }
    }
    matched.unwrap_or(ToolDecision::Unroutable)
}
