//! Shared stream-and-accumulate utility: forwards each fragment to the caller
//! immediately and appends the full concatenation to conversation memory once
//! the stream is exhausted.

use futures::stream::{self, StreamExt};

use crate::chat::memory::SessionStore;
use crate::llm_client::{LlmError, TextStream};

struct Accumulate {
    inner: TextStream,
    acc: String,
    sessions: SessionStore,
    session_id: String,
    failed: bool,
}

/// Wraps a fragment stream so the assistant's full reply lands in the
/// session's memory when the stream ends. A mid-stream error is forwarded and
/// the partial text is discarded (the turn failed; there is no recovery).
pub fn accumulate_into_memory(
    inner: TextStream,
    sessions: SessionStore,
    session_id: String,
) -> TextStream {
    let state = Accumulate {
        inner,
        acc: String::new(),
        sessions,
        session_id,
        failed: false,
    };

    Box::pin(stream::unfold(state, |mut st| async move {
        match st.inner.next().await {
            Some(Ok(fragment)) => {
                st.acc.push_str(&fragment);
                Some((Ok::<String, LlmError>(fragment), st))
            }
            Some(Err(e)) => {
                st.failed = true;
                Some((Err(e), st))
            }
            None => {
                if !st.failed && !st.acc.is_empty() {
                    st.sessions.append_assistant(&st.session_id, &st.acc);
                }
                None
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream::iter;

    #[tokio::test]
    async fn test_fragments_forwarded_in_order() {
        let sessions = SessionStore::new();
        let inner = iter(vec![Ok("Hello ".to_string()), Ok("world".to_string())]).boxed();
        let wrapped = accumulate_into_memory(inner, sessions, "s".to_string());

        let fragments: Vec<String> = wrapped.map(|f| f.unwrap()).collect().await;
        assert_eq!(fragments, vec!["Hello ", "world"]);
    }

    #[tokio::test]
    async fn test_concatenation_appended_after_exhaustion() {
        let sessions = SessionStore::new();
        let inner = iter(vec![Ok("Hi ".to_string()), Ok("there".to_string())]).boxed();
        let wrapped = accumulate_into_memory(inner, sessions.clone(), "s".to_string());

        // Nothing is in memory until the stream is drained.
        assert_eq!(sessions.memory_len("s"), 0);
        let _: Vec<_> = wrapped.collect().await;
        assert!(sessions.transcript("s").contains("Assistant: Hi there"));
    }

    #[tokio::test]
    async fn test_empty_stream_appends_nothing() {
        let sessions = SessionStore::new();
        let inner = iter(Vec::<Result<String, LlmError>>::new()).boxed();
        let wrapped = accumulate_into_memory(inner, sessions.clone(), "s".to_string());
        let _: Vec<_> = wrapped.collect().await;
        assert_eq!(sessions.memory_len("s"), 0);
    }
}
