// All LLM prompt constants for the resume module.

/// System prompt for resume summarization.
pub const SUMMARY_SYSTEM: &str = "\
    You summarize candidate resumes for HR staff. \
    Be factual and concise. \
    Use only information present in the resume text.";

/// Summarization prompt template. Replace `{resume_text}`.
pub const SUMMARY_PROMPT_TEMPLATE: &str = r#"Summarize the following resume for an HR reviewer.

Cover, when present:
- Candidate name and contact details
- Current/most recent role
- Key skills
- Notable experience or education

End by asking whether the resume should be saved to the database.

RESUME TEXT:
{resume_text}"#;

/// System prompt for structured candidate field extraction.
pub const CANDIDATE_EXTRACT_SYSTEM: &str = "\
    You extract structured fields from resume text. \
    Respond with ONLY a JSON object, no markdown fences, no commentary. \
    Use null for any field you cannot find.";

/// Candidate field extraction prompt template. Replace `{resume_text}`.
/// The response must deserialize into `CandidateFields`.
pub const CANDIDATE_EXTRACT_PROMPT_TEMPLATE: &str = r#"Extract these fields from the resume text:

{
  "candidate_name": string or null,
  "employee_email": string or null,
  "phone": string or null,
  "skills": string or null (comma-separated list)
}

Return ONLY the JSON object.

RESUME TEXT:
{resume_text}"#;
