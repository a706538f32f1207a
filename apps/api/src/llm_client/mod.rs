//! LLM Client — the single point of entry for all Gemini API calls in hrdesk.
//!
//! ARCHITECTURAL RULE: No other module may call the Gemini API directly.
//! All LLM interactions MUST go through the `LlmGateway` trait, carried in
//! `AppState` as `Arc<dyn LlmGateway>` so tests can swap in a scripted fake.
//!
//! Model: gemini-2.5-flash (hardcoded — do not make configurable to prevent drift)

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// The model used for all LLM calls in hrdesk.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "gemini-2.5-flash";
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 2048;

/// A finite, in-order sequence of generated text fragments.
/// Pull-based: each poll may block until the upstream produces the next
/// fragment. Not restartable, no cancellation.
pub type TextStream = BoxStream<'static, Result<String, LlmError>>;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// The text generation gateway. One synchronous "full response" operation and
/// one streaming operation. No retries, no rate limiting.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Generates the full response text for a prompt.
    async fn generate(&self, prompt: &str, system: &str) -> Result<String, LlmError>;

    /// Generates a lazy stream of text fragments, emitted in generation order.
    async fn generate_stream(&self, prompt: &str, system: &str) -> Result<TextStream, LlmError>;
}

/// Convenience helper that calls the gateway and deserializes the text
/// response as JSON. The prompt must instruct the model to return valid JSON.
pub async fn call_json<T: DeserializeOwned>(
    gateway: &dyn LlmGateway,
    prompt: &str,
    system: &str,
) -> Result<T, LlmError> {
    let text = gateway.generate(prompt, system).await?;
    let text = strip_json_fences(&text);
    serde_json::from_str(text).map_err(LlmError::Parse)
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "systemInstruction")]
    system_instruction: SystemInstruction<'a>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenates the text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let joined: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// GeminiClient
// ────────────────────────────────────────────────────────────────────────────

/// The production gateway implementation, backed by the Gemini REST API.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            base_url: GEMINI_API_URL.to_string(),
        }
    }

    fn build_request<'a>(prompt: &'a str, system: &'a str) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: SystemInstruction {
                parts: vec![Part { text: system }],
            },
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_TOKENS,
            },
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GeminiError>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        Err(LlmError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl LlmGateway for GeminiClient {
    async fn generate(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, MODEL, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&Self::build_request(prompt, system))
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let body: GenerateContentResponse = response.json().await?;

        let text = body.text().ok_or(LlmError::EmptyContent)?;
        debug!("LLM call succeeded: {} chars", text.len());
        Ok(text)
    }

    async fn generate_stream(&self, prompt: &str, system: &str) -> Result<TextStream, LlmError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, MODEL, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&Self::build_request(prompt, system))
            .send()
            .await?;

        let response = Self::check_status(response).await?;

        let state = SseState {
            bytes: response.bytes_stream().boxed(),
            buffer: String::new(),
            pending: VecDeque::new(),
        };

        Ok(Box::pin(stream::try_unfold(state, |mut st| async move {
            loop {
                if let Some(fragment) = st.pending.pop_front() {
                    return Ok(Some((fragment, st)));
                }
                match st.bytes.next().await {
                    Some(Ok(chunk)) => {
                        st.buffer.push_str(&String::from_utf8_lossy(&chunk));
                        drain_sse_lines(&mut st.buffer, &mut st.pending)?;
                    }
                    Some(Err(e)) => return Err(LlmError::Http(e)),
                    None => {
                        // Flush a final unterminated data line, if any.
                        let residual = std::mem::take(&mut st.buffer);
                        parse_sse_line(residual.trim_end(), &mut st.pending)?;
                        return Ok(st.pending.pop_front().map(|fragment| (fragment, st)));
                    }
                }
            }
        })))
    }
}

struct SseState {
    bytes: BoxStream<'static, reqwest::Result<bytes::Bytes>>,
    buffer: String,
    pending: VecDeque<String>,
}

/// Consumes every complete line in `buffer`, queueing extracted text fragments.
fn drain_sse_lines(buffer: &mut String, pending: &mut VecDeque<String>) -> Result<(), LlmError> {
    while let Some(pos) = buffer.find('\n') {
        let line: String = buffer.drain(..=pos).collect();
        parse_sse_line(line.trim_end(), pending)?;
    }
    Ok(())
}

/// Parses one server-sent-events line. Non-data lines (event names, blank
/// separators) are ignored; each data line carries one GenerateContentResponse.
fn parse_sse_line(line: &str, pending: &mut VecDeque<String>) -> Result<(), LlmError> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(());
    };
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(());
    }
    let response: GenerateContentResponse = serde_json::from_str(data)?;
    if let Some(text) = response.text() {
        pending.push_back(text);
    }
    Ok(())
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Test support
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// A scripted gateway for unit tests: returns canned replies in order.
    /// Streamed replies are split into word-sized fragments.
    pub struct ScriptedGateway {
        replies: Mutex<VecDeque<String>>,
    }

    impl ScriptedGateway {
        pub fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
            }
        }

        /// Number of scripted replies not yet consumed.
        pub fn remaining(&self) -> usize {
            self.replies
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .len()
        }

        fn next_reply(&self) -> Result<String, LlmError> {
            self.replies
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .pop_front()
                .ok_or(LlmError::EmptyContent)
        }
    }

    #[async_trait]
    impl LlmGateway for ScriptedGateway {
        async fn generate(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            self.next_reply()
        }

        async fn generate_stream(
            &self,
            _prompt: &str,
            _system: &str,
        ) -> Result<TextStream, LlmError> {
            let reply = self.next_reply()?;
            let fragments: Vec<Result<String, LlmError>> = reply
                .split_inclusive(' ')
                .map(|s| Ok(s.to_string()))
                .collect();
            Ok(stream::iter(fragments).boxed())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_response_text_joins_parts() {
        let json = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "Hello "}, {"text": "world"}], "role": "model"}
            }]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text().unwrap(), "Hello world");
    }

    #[test]
    fn test_response_text_empty_candidates_is_none() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_parse_sse_line_extracts_fragment() {
        let mut pending = VecDeque::new();
        let line = r#"data: {"candidates":[{"content":{"parts":[{"text":"chunk"}]}}]}"#;
        parse_sse_line(line, &mut pending).unwrap();
        assert_eq!(pending.pop_front().unwrap(), "chunk");
    }

    #[test]
    fn test_parse_sse_line_ignores_non_data_lines() {
        let mut pending = VecDeque::new();
        parse_sse_line("event: ping", &mut pending).unwrap();
        parse_sse_line("", &mut pending).unwrap();
        parse_sse_line("data: [DONE]", &mut pending).unwrap();
        assert!(pending.is_empty());
    }

    #[test]
    fn test_drain_sse_lines_handles_partial_tail() {
        let mut pending = VecDeque::new();
        let mut buffer = String::from(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"a\"}]}}]}\n\ndata: {\"cand",
        );
        drain_sse_lines(&mut buffer, &mut pending).unwrap();
        assert_eq!(pending.len(), 1);
        // The incomplete trailing line stays buffered for the next chunk.
        assert!(buffer.starts_with("data: {\"cand"));
    }
}
