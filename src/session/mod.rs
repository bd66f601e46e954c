//! Per-chat conversation state.
//!
//! [`SessionStore`] maps a chat id to its [`ChatSession`] (mode + history).
//! Each session sits behind its own `tokio::sync::Mutex`, so a handler can
//! hold one chat's lock across an await (e.g. the generation call) without
//! blocking other chats. The outer map lock is only held for lookups.
//!
//! Nothing here is persisted; all state is lost on restart.

pub mod mode;
mod types;

pub use mode::Mode;
pub use types::{Role, Turn};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::error::AppError;

/// Telegram chat identifier.
pub type ChatId = i64;

/// Shared handle to one chat's session.
pub type SessionHandle = Arc<AsyncMutex<ChatSession>>;

// ── ChatSession ─────────────────────────────────────────────────────────────

/// Mutable state of a single chat.
#[derive(Debug, Clone)]
pub struct ChatSession {
    mode: Mode,
    history: Vec<Turn>,
    /// Maximum turns kept; `0` keeps everything.
    history_cap: usize,
}

impl ChatSession {
    pub fn new(history_cap: usize) -> Self {
        Self { mode: Mode::default(), history: Vec::new(), history_cap }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Ordered turns, oldest first.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Append a turn at the end of the history.
    ///
    /// Whitespace-only text is rejected. When the cap is exceeded the
    /// oldest turns are dropped until the history fits and opens with a
    /// user turn.
    pub fn append(&mut self, role: Role, text: impl Into<String>) -> Result<(), AppError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(AppError::InvalidInput(format!("empty {role} turn")));
        }
        self.history.push(Turn { role, text });
        self.trim_to_cap();
        Ok(())
    }

    /// Clear the history. The mode is kept.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    fn trim_to_cap(&mut self) {
        if self.history_cap == 0 || self.history.len() <= self.history_cap {
            return;
        }
        let mut excess = self.history.len() - self.history_cap;
        while excess < self.history.len() && self.history[excess].role != Role::User {
            excess += 1;
        }
        self.history.drain(..excess);
    }
}

// ── SessionStore ────────────────────────────────────────────────────────────

/// Keyed store of every chat's session, created lazily on first access.
pub struct SessionStore {
    sessions: Mutex<HashMap<ChatId, SessionHandle>>,
    history_cap: usize,
}

impl SessionStore {
    pub fn new(history_cap: usize) -> Self {
        Self { sessions: Mutex::new(HashMap::new()), history_cap }
    }

    /// Get the chat's session, creating an empty one if needed.
    ///
    /// Lock the returned handle for the duration of a handling unit to
    /// serialize all operations on that chat.
    pub fn session(&self, chat_id: ChatId) -> SessionHandle {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(chat_id)
            .or_insert_with(|| {
                debug!(chat_id, "creating chat session");
                Arc::new(AsyncMutex::new(ChatSession::new(self.history_cap)))
            })
            .clone()
    }

    fn existing(&self, chat_id: ChatId) -> Option<SessionHandle> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.get(&chat_id).cloned()
    }

    pub async fn append(&self, chat_id: ChatId, role: Role, text: &str) -> Result<(), AppError> {
        self.session(chat_id).lock().await.append(role, text)
    }

    /// Clear the chat's history. Idempotent; never creates a session.
    pub async fn reset(&self, chat_id: ChatId) {
        if let Some(session) = self.existing(chat_id) {
            session.lock().await.reset();
        }
    }

    /// Full ordered history; empty when the chat has no session yet.
    pub async fn read(&self, chat_id: ChatId) -> Vec<Turn> {
        match self.existing(chat_id) {
            Some(session) => session.lock().await.history().to_vec(),
            None => Vec::new(),
        }
    }

    pub async fn mode(&self, chat_id: ChatId) -> Mode {
        match self.existing(chat_id) {
            Some(session) => session.lock().await.mode(),
            None => Mode::default(),
        }
    }

    pub async fn set_mode(&self, chat_id: ChatId, mode: Mode) {
        self.session(chat_id).lock().await.set_mode(mode);
    }

    /// Number of chats that have a session.
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Turns currently held across all chats.
    ///
    /// Chats whose lock is held (mid-generation) are skipped rather than
    /// waited on, so the count is a lower bound while replies are in flight.
    pub fn total_turns(&self) -> usize {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .values()
            .filter_map(|handle| handle.try_lock().ok().map(|s| s.history().len()))
            .sum()
    }
}
