//! Database query tool — natural language to SQL, execution, and narration.
//!
//! One turn makes at most two LLM calls: one to generate the SQL statement,
//! and (on the read path, when rows came back) one to narrate the result.
//! Generated SQL is classified before execution; schema-changing statements
//! are rejected and never reach the pool.

pub mod prompts;

use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::chat::dispatch::ToolReply;
use crate::chat::stream::accumulate_into_memory;
use crate::errors::AppError;
use crate::state::AppState;
use self::prompts::{
    NARRATION_PROMPT_TEMPLATE, NARRATION_SYSTEM, SCHEMA_DESCRIPTION,
    SQL_GENERATION_PROMPT_TEMPLATE, SQL_GENERATION_SYSTEM,
};

/// Fixed reply when a read query matches no rows.
pub const NO_RESULTS_MESSAGE: &str = "No results found.";

/// How a generated statement is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// `SELECT ...` — fetch rows and narrate them.
    Read,
    /// DML (INSERT/UPDATE/DELETE) — execute and report rows affected.
    Write,
}

/// Classifies a generated statement by its leading keyword. Schema-changing
/// statements (CREATE/DROP/ALTER/TRUNCATE) are a validation error — the
/// generator is prompted never to produce them, and this is the backstop.
pub fn classify_statement(statement: &str) -> Result<StatementKind, AppError> {
    let keyword = statement
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();

    match keyword.as_str() {
        "select" => Ok(StatementKind::Read),
        "create" | "drop" | "alter" | "truncate" => Err(AppError::Validation(format!(
            "Schema-changing statements are not allowed (got '{keyword}')"
        ))),
        "" => Err(AppError::Validation(
            "The SQL generator returned an empty statement".to_string(),
        )),
        _ => Ok(StatementKind::Write),
    }
}

/// Strips a markdown code fence (with optional `sql` tag) wrapping the
/// statement. Idempotent; unfenced input passes through untouched.
pub fn strip_sql_fences(text: &str) -> String {
    let text = text.trim();

    let inner = if let Some(stripped) = text.strip_prefix("```") {
        let stripped = stripped.strip_suffix("```").unwrap_or(stripped);
        // A fence tag sits directly against the backticks and ends the line;
        // statement text starting with the letters "sql" must survive.
        match stripped.get(..3) {
            Some(tag)
                if tag.eq_ignore_ascii_case("sql")
                    && stripped[3..].starts_with(|c: char| c.is_whitespace()) =>
            {
                &stripped[3..]
            }
            _ => stripped,
        }
    } else {
        text
    };

    inner.trim().to_string()
}

/// Converts one Postgres row to a JSON object, keyed by column name.
/// Unrecognized types fall back to their string decoding; a value that
/// cannot be decoded at all becomes null.
pub fn row_to_json(row: &PgRow) -> Value {
    let mut object = serde_json::Map::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let is_null = row
            .try_get_raw(idx)
            .map(|raw| raw.is_null())
            .unwrap_or(true);
        let value = if is_null {
            Value::Null
        } else {
            decode_column(row, idx, column.type_info().name())
        };
        object.insert(column.name().to_string(), value);
    }
    Value::Object(object)
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> Value {
    match type_name {
        "BOOL" => row.try_get::<bool, _>(idx).map(Value::Bool).ok(),
        "INT2" => row.try_get::<i16, _>(idx).map(Value::from).ok(),
        "INT4" => row.try_get::<i32, _>(idx).map(Value::from).ok(),
        "INT8" => row.try_get::<i64, _>(idx).map(Value::from).ok(),
        "FLOAT4" => row.try_get::<f32, _>(idx).map(|v| Value::from(v as f64)).ok(),
        "FLOAT8" => row.try_get::<f64, _>(idx).map(Value::from).ok(),
        "UUID" => row
            .try_get::<uuid::Uuid, _>(idx)
            .map(|v| Value::String(v.to_string()))
            .ok(),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(idx)
            .map(|v| Value::String(v.to_string()))
            .ok(),
        "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(idx)
            .map(|v| Value::String(v.to_string()))
            .ok(),
        "TIMESTAMPTZ" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(idx)
            .map(|v| Value::String(v.to_rfc3339()))
            .ok(),
        "JSON" | "JSONB" => row.try_get::<Value, _>(idx).ok(),
        _ => row.try_get::<String, _>(idx).map(Value::String).ok(),
    }
    .unwrap_or(Value::Null)
}

/// Answers a database question: generate SQL, execute it, present the result.
pub async fn db_query_tool(
    state: &AppState,
    session_id: &str,
    question: &str,
    stream: bool,
) -> Result<ToolReply, AppError> {
    let prompt = SQL_GENERATION_PROMPT_TEMPLATE
        .replace("{schema}", SCHEMA_DESCRIPTION)
        .replace("{question}", question);

    let raw = state
        .llm
        .generate(&prompt, SQL_GENERATION_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("SQL generation failed: {e}")))?;
    let statement = strip_sql_fences(&raw);
    tracing::info!("Generated statement for session {session_id}: {statement}");

    match classify_statement(&statement)? {
        StatementKind::Read => read_and_narrate(state, session_id, question, &statement, stream).await,
        StatementKind::Write => execute_write(state, session_id, &statement).await,
    }
}

async fn read_and_narrate(
    state: &AppState,
    session_id: &str,
    question: &str,
    statement: &str,
    stream: bool,
) -> Result<ToolReply, AppError> {
    let rows = sqlx::query(statement)
        .fetch_all(&state.db)
        .await
        .map_err(|e| AppError::SqlExecution {
            statement: statement.to_string(),
            message: e.to_string(),
        })?;

    if rows.is_empty() {
        state.sessions.append_assistant(session_id, NO_RESULTS_MESSAGE);
        return Ok(ToolReply::Text(NO_RESULTS_MESSAGE.to_string()));
    }

    let rows_json: Vec<Value> = rows.iter().map(row_to_json).collect();
    let rows_text = serde_json::to_string_pretty(&rows_json).unwrap_or_default();
    let narration_prompt = NARRATION_PROMPT_TEMPLATE
        .replace("{question}", question)
        .replace("{rows}", &rows_text);

    if stream {
        let fragments = state
            .llm
            .generate_stream(&narration_prompt, NARRATION_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Result narration failed: {e}")))?;
        Ok(ToolReply::Stream(accumulate_into_memory(
            fragments,
            state.sessions.clone(),
            session_id.to_string(),
        )))
    } else {
        let narration = state
            .llm
            .generate(&narration_prompt, NARRATION_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Result narration failed: {e}")))?;
        state.sessions.append_assistant(session_id, &narration);
        Ok(ToolReply::Text(narration))
    }
}

async fn execute_write(
    state: &AppState,
    session_id: &str,
    statement: &str,
) -> Result<ToolReply, AppError> {
    let result = sqlx::query(statement)
        .execute(&state.db)
        .await
        .map_err(|e| AppError::SqlExecution {
            statement: statement.to_string(),
            message: e.to_string(),
        })?;

    let ack = format!(
        "Statement executed successfully ({} rows affected).\n\n[SQL]\n{statement}",
        result.rows_affected()
    );
    state.sessions.append_assistant(session_id, &ack);
    Ok(ToolReply::Text(ack))
}
