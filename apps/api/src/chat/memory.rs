//! Bounded conversation memory — an append-only log of user/assistant turns,
//! truncated FIFO to the most recent entries. One isolated memory per
//! conversation session; nothing here survives a process restart.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

/// Retained conversation entries per session. Older entries are dropped first.
pub const MEMORY_CAPACITY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// A single tagged line of conversation. Ordering is chronological.
#[derive(Debug, Clone)]
pub struct ConversationEntry {
    pub role: Role,
    pub content: String,
}

/// Ordered log of conversation entries, capped at `MEMORY_CAPACITY`.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    entries: VecDeque<ConversationEntry>,
}

impl ConversationMemory {
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.entries.push_back(ConversationEntry {
            role,
            content: content.into(),
        });
        while self.entries.len() > MEMORY_CAPACITY {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ConversationEntry> {
        self.entries.iter()
    }

    /// Renders the log as "User: …" / "Assistant: …" lines for prompt context.
    pub fn transcript(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}: {}", e.role.label(), e.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Default)]
struct Session {
    memory: ConversationMemory,
    /// Raw text of the last uploaded resume, staged for the confirm step.
    pending_resume: Option<String>,
}

/// Process-wide registry of conversation sessions.
///
/// The lock is held only for short synchronous operations (append, snapshot),
/// never across an await point — turns for one session serialize through it,
/// distinct sessions stay isolated.
///
/// Sessions are never evicted: the map grows for the life of the process and
/// is cleared only by restart. Each entry is small (at most five turns of
/// text plus any staged resume).
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the given session id, or mints a fresh one if absent.
    pub fn ensure(&self, session_id: Option<String>) -> String {
        let id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        self.lock().entry(id.clone()).or_default();
        id
    }

    pub fn append_user(&self, session_id: &str, content: &str) {
        self.lock()
            .entry(session_id.to_string())
            .or_default()
            .memory
            .append(Role::User, content);
    }

    pub fn append_assistant(&self, session_id: &str, content: &str) {
        self.lock()
            .entry(session_id.to_string())
            .or_default()
            .memory
            .append(Role::Assistant, content);
    }

    /// Snapshot of the session transcript for prompt building.
    pub fn transcript(&self, session_id: &str) -> String {
        self.lock()
            .get(session_id)
            .map(|s| s.memory.transcript())
            .unwrap_or_default()
    }

    pub fn memory_len(&self, session_id: &str) -> usize {
        self.lock().get(session_id).map(|s| s.memory.len()).unwrap_or(0)
    }

    pub fn stage_resume(&self, session_id: &str, raw_text: String) {
        self.lock()
            .entry(session_id.to_string())
            .or_default()
            .pending_resume = Some(raw_text);
    }

    pub fn pending_resume(&self, session_id: &str) -> Option<String> {
        self.lock()
            .get(session_id)
            .and_then(|s| s.pending_resume.clone())
    }

    /// Drops the staged resume after a successful save.
    pub fn clear_pending_resume(&self, session_id: &str) {
        if let Some(session) = self.lock().get_mut(session_id) {
            session.pending_resume = None;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_truncates_fifo_at_capacity() {
        let mut memory = ConversationMemory::default();
        for i in 0..8 {
            memory.append(Role::User, format!("message {i}"));
        }
        assert_eq!(memory.len(), MEMORY_CAPACITY);
        // Oldest entries dropped first: 0, 1, 2 are gone.
        let first = memory.entries().next().unwrap();
        assert_eq!(first.content, "message 3");
    }

    #[test]
    fn test_memory_preserves_chronological_order() {
        let mut memory = ConversationMemory::default();
        memory.append(Role::User, "hi");
        memory.append(Role::Assistant, "hello");
        let contents: Vec<_> = memory.entries().map(|e| e.content.clone()).collect();
        assert_eq!(contents, vec!["hi", "hello"]);
    }

    #[test]
    fn test_transcript_format() {
        let mut memory = ConversationMemory::default();
        memory.append(Role::User, "who is on leave?");
        memory.append(Role::Assistant, "Jane is on leave.");
        assert_eq!(
            memory.transcript(),
            "User: who is on leave?\nAssistant: Jane is on leave."
        );
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        store.append_user("a", "hello from a");
        store.append_user("b", "hello from b");
        assert!(store.transcript("a").contains("hello from a"));
        assert!(!store.transcript("a").contains("hello from b"));
    }

    #[test]
    fn test_store_never_exceeds_capacity_across_turns() {
        let store = SessionStore::new();
        for i in 0..20 {
            store.append_user("s", &format!("u{i}"));
            store.append_assistant("s", &format!("a{i}"));
        }
        assert_eq!(store.memory_len("s"), MEMORY_CAPACITY);
    }

    #[test]
    fn test_ensure_mints_uuid_when_absent() {
        let store = SessionStore::new();
        let id = store.ensure(None);
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(store.ensure(Some(id.clone())), id);
    }

    #[test]
    fn test_pending_resume_staging_and_clear() {
        let store = SessionStore::new();
        assert!(store.pending_resume("s").is_none());
        store.stage_resume("s", "raw resume text".to_string());
        assert_eq!(store.pending_resume("s").unwrap(), "raw resume text");
        store.clear_pending_resume("s");
        assert!(store.pending_resume("s").is_none());
    }
}
