use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Title given to sessions that have not yet received a user message.
pub const DEFAULT_TITLE: &str = "New Chat";

/// Prefix applied to titles of imported sessions.
pub const IMPORT_TITLE_PREFIX: &str = "[imported] ";

const TITLE_MAX_CHARS: usize = 20;

/// A persisted conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub messages: Vec<Message>,
    /// Unix millis of the last mutation; sessions display newest-first.
    #[serde(default)]
    pub last_updated: i64,
}

impl Session {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            messages: Vec::new(),
            last_updated: crate::now_millis(),
        }
    }

    pub fn touch(&mut self) {
        self.last_updated = crate::now_millis();
    }
}

/// Summary of a session for the sidebar listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub last_updated: i64,
    pub message_count: usize,
}

impl From<&Session> for SessionSummary {
    fn from(s: &Session) -> Self {
        Self {
            id: s.id.clone(),
            title: s.title.clone(),
            last_updated: s.last_updated,
            message_count: s.messages.len(),
        }
    }
}

/// The full persisted collection — the on-disk schema is
/// `{ "sessions": [...], "activeSessionId": "..." | null }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCollection {
    pub sessions: Vec<Session>,
    pub active_session_id: Option<String>,
}

/// Derive a session title from the first user message: at most 20
/// characters, with an ellipsis when truncated. Char-based so multibyte
/// text is never split.
pub fn derive_title(first_user_message: &str) -> String {
    let mut chars = first_user_message.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// File name for a single-session export: sanitized title plus ISO date.
/// Only alphanumeric characters and whitespace survive; an empty result
/// falls back to "chat".
pub fn export_file_name(title: &str, iso_date: &str) -> String {
    let safe: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    let safe = safe.trim();
    let stem = if safe.is_empty() { "chat" } else { safe };
    format!("{}_{}.json", stem, iso_date)
}
