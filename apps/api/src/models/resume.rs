use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A persisted resume record.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ResumeRow {
    pub id: i32,
    pub employee_email: Option<String>,
    pub candidate_name: Option<String>,
    pub phone: Option<String>,
    pub skills: Option<String>,
    pub raw_text: Option<String>,
    pub created_at: DateTime<Utc>,
}
