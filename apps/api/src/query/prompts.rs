// All LLM prompt constants for the database query module.

/// Schema description shared by the router and the SQL generator.
pub const SCHEMA_DESCRIPTION: &str = "\
Tables:
1. employees (id, name, role, email, leave_date, skills, on_leave [boolean])
2. resumes (id, employee_email, candidate_name, phone, skills, raw_text)";

/// System prompt for SQL generation — output is the bare statement only.
pub const SQL_GENERATION_SYSTEM: &str = "\
    You translate natural language questions into SQL for a PostgreSQL database. \
    Return ONLY the SQL statement. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or comments. \
    Never emit CREATE, DROP, ALTER or TRUNCATE statements.";

/// SQL generation prompt template. Replace `{schema}` and `{question}`.
pub const SQL_GENERATION_PROMPT_TEMPLATE: &str = r#"Translate the user's question into a single SQL statement.

SCHEMA:
{schema}

RULES:
- Always make results human-friendly.
- For employees.on_leave, convert the boolean:
  CASE WHEN on_leave THEN 'Yes' ELSE 'No' END AS on_leave
  Never return raw true/false values.
- Prefer clear column aliases when transforming values.
- Return ONLY the SQL statement (no markdown, no explanations).

USER QUESTION:
{question}"#;

/// System prompt for narrating query results to HR staff.
pub const NARRATION_SYSTEM: &str = "\
    You present database query results to HR staff. \
    Be concise and accurate. \
    Use only the rows you are given — do not invent data.";

/// Result narration prompt template. Replace `{question}` and `{rows}`.
pub const NARRATION_PROMPT_TEMPLATE: &str = r#"The user asked:
{question}

The database returned these rows (JSON):
{rows}

Present the result as a small readable table or list, followed by a short
one-or-two sentence explanation. Use the values exactly as given — they are
already human-friendly (for example, on_leave is 'Yes' or 'No')."#;
