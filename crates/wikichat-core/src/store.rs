//! The conversation store — owns every session and message.
//!
//! All conversation state lives here behind interior mutability; the
//! generation controller and the UI hold an `Rc` to the store and never a
//! private copy of message data. Every mutation flushes the collection
//! through the storage port and emits `SessionsChanged`.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use wikichat_types::event::AssistantEvent;
use wikichat_types::message::{Message, Role};
use wikichat_types::session::{
    derive_title, Session, SessionCollection, SessionSummary, DEFAULT_TITLE, IMPORT_TITLE_PREFIX,
};
use wikichat_types::{AssistantError, Result};

use crate::event_bus::EventBus;
use crate::ports::StoragePort;

/// Storage key for the persisted session collection.
pub const SESSIONS_KEY: &str = "wikichat:sessions:v1";

pub struct ConversationStore {
    data: RefCell<SessionCollection>,
    storage: Rc<dyn StoragePort>,
    events: EventBus,
}

impl ConversationStore {
    pub fn new(storage: Rc<dyn StoragePort>, events: EventBus) -> Self {
        Self {
            data: RefCell::new(SessionCollection::default()),
            storage,
            events,
        }
    }

    /// Load the persisted collection. Corrupt or missing data falls back to
    /// the empty default; the single-default-session invariant is restored
    /// either way.
    pub async fn init(&self) {
        let loaded = match self.storage.get(SESSIONS_KEY).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<SessionCollection>(&bytes) {
                Ok(collection) => collection,
                Err(e) => {
                    log::warn!("stored sessions unreadable, starting fresh: {}", e);
                    SessionCollection::default()
                }
            },
            Ok(None) => SessionCollection::default(),
            Err(e) => {
                log::warn!("session load failed, starting fresh: {}", e);
                SessionCollection::default()
            }
        };

        let repaired = {
            let mut data = self.data.borrow_mut();
            *data = loaded;
            for session in &mut data.sessions {
                for msg in &mut session.messages {
                    msg.normalize();
                }
            }
            Self::ensure_invariants(&mut data)
        };
        if repaired {
            self.flush().await;
        }
        log::info!(
            "conversation store ready ({} sessions, backend: {})",
            self.data.borrow().sessions.len(),
            self.storage.backend_name()
        );
        self.notify();
    }

    /// Restore the never-empty / valid-active-id invariants.
    /// Returns true when something had to change.
    fn ensure_invariants(data: &mut SessionCollection) -> bool {
        if data.sessions.is_empty() {
            let session = Session::new(DEFAULT_TITLE);
            data.active_session_id = Some(session.id.clone());
            data.sessions.push(session);
            return true;
        }
        let active_ok = data
            .active_session_id
            .as_ref()
            .is_some_and(|id| data.sessions.iter().any(|s| &s.id == id));
        if !active_ok {
            data.active_session_id = Some(data.sessions[0].id.clone());
            return true;
        }
        false
    }

    // ─── Reads ───────────────────────────────────────────────

    pub fn active_id(&self) -> Option<String> {
        self.data.borrow().active_session_id.clone()
    }

    /// The active session. Never fails: a dangling or unset active id is
    /// recovered by creating a fresh default session on the spot (the
    /// durable write catches up on the next mutation).
    pub fn active(&self) -> Session {
        {
            let data = self.data.borrow();
            if let Some(id) = &data.active_session_id {
                if let Some(session) = data.sessions.iter().find(|s| &s.id == id) {
                    return session.clone();
                }
            }
        }
        log::warn!("active session id dangling, recreating default");
        let session = Session::new(DEFAULT_TITLE);
        {
            let mut data = self.data.borrow_mut();
            data.active_session_id = Some(session.id.clone());
            data.sessions.insert(0, session.clone());
        }
        self.notify();
        session
    }

    /// Ordered sidebar projection, newest-first.
    pub fn summaries(&self) -> Vec<SessionSummary> {
        self.data
            .borrow()
            .sessions
            .iter()
            .map(SessionSummary::from)
            .collect()
    }

    // ─── Session CRUD ────────────────────────────────────────

    /// Prepend a new empty session and make it active.
    pub async fn create_session(&self, title: Option<&str>) -> Session {
        let session = Session::new(title.unwrap_or(DEFAULT_TITLE));
        {
            let mut data = self.data.borrow_mut();
            data.active_session_id = Some(session.id.clone());
            data.sessions.insert(0, session.clone());
        }
        self.flush().await;
        self.notify();
        session
    }

    pub async fn delete_session(&self, id: &str) {
        {
            let mut data = self.data.borrow_mut();
            data.sessions.retain(|s| s.id != id);
            if data.active_session_id.as_deref() == Some(id) {
                data.active_session_id = None;
            }
            Self::ensure_invariants(&mut data);
        }
        self.flush().await;
        self.notify();
    }

    /// Activate `id` if it exists. No mutation and `false` otherwise.
    pub async fn switch_session(&self, id: &str) -> bool {
        let found = {
            let mut data = self.data.borrow_mut();
            if data.sessions.iter().any(|s| s.id == id) {
                data.active_session_id = Some(id.to_string());
                true
            } else {
                false
            }
        };
        if found {
            self.flush().await;
            self.notify();
        }
        found
    }

    /// Drop everything, durable state included, then restore the
    /// single-default-session invariant.
    pub async fn clear_all(&self) {
        if let Err(e) = self.storage.delete(SESSIONS_KEY).await {
            log::warn!("clearing stored sessions failed: {}", e);
        }
        *self.data.borrow_mut() = SessionCollection::default();
        self.init().await;
    }

    // ─── Message mutations ───────────────────────────────────

    /// Append a turn to the active session. The first user message derives
    /// the session title; sessions re-sort newest-first.
    pub async fn append_message(&self, role: Role, content: &str) {
        // Recovers a dangling active id before we take the mutable borrow.
        let active_id = self.active().id;
        {
            let mut data = self.data.borrow_mut();
            if let Some(session) = data.sessions.iter_mut().find(|s| s.id == active_id) {
                session.messages.push(Message::new(role, content));
                if role == Role::User && session.title == DEFAULT_TITLE {
                    session.title = derive_title(content);
                }
                session.touch();
            }
            data.sessions
                .sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        }
        self.flush().await;
        self.notify();
    }

    /// Overwrite the last message of the active session with a new variant
    /// state — only when that message is an assistant turn. Anything else
    /// is a silent no-op (defensive guard, not an error).
    pub async fn commit_assistant_variant(&self, content: &str, swipes: Vec<String>, index: usize) {
        let changed = {
            let mut data = self.data.borrow_mut();
            let active_id = data.active_session_id.clone();
            let session =
                active_id.and_then(|id| data.sessions.iter_mut().find(move |s| s.id == id));
            let mut changed = false;
            if let Some(session) = session {
                if let Some(last) = session.messages.last_mut() {
                    if last.role == Role::Assistant {
                        last.content = content.to_string();
                        last.swipes = swipes;
                        last.swipe_index = index;
                        last.normalize();
                        session.touch();
                        changed = true;
                    }
                }
            }
            changed
        };
        if changed {
            self.flush().await;
            self.notify();
        }
    }

    /// Select an existing variant of a message in the active session.
    pub async fn select_swipe(&self, message_index: usize, swipe_index: usize) {
        let changed = self.with_message_mut(message_index, |msg| msg.select_swipe(swipe_index));
        if changed {
            self.flush().await;
            self.notify();
        }
    }

    /// Rewrite the currently selected variant of a message.
    pub async fn edit_message(&self, message_index: usize, new_content: &str) {
        let changed = self.with_message_mut(message_index, |msg| {
            msg.edit_current(new_content);
            true
        });
        if changed {
            self.flush().await;
            self.notify();
        }
    }

    /// Remove one message from the active session.
    pub async fn delete_message(&self, message_index: usize) {
        let changed = {
            let mut data = self.data.borrow_mut();
            let active_id = data.active_session_id.clone();
            match active_id.and_then(|id| data.sessions.iter_mut().find(move |s| s.id == id)) {
                Some(session) if message_index < session.messages.len() => {
                    session.messages.remove(message_index);
                    session.touch();
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.flush().await;
            self.notify();
        }
    }

    fn with_message_mut(&self, index: usize, f: impl FnOnce(&mut Message) -> bool) -> bool {
        let mut data = self.data.borrow_mut();
        let active_id = data.active_session_id.clone();
        let session = active_id.and_then(|id| data.sessions.iter_mut().find(move |s| s.id == id));
        match session {
            Some(session) => match session.messages.get_mut(index) {
                Some(msg) => {
                    let changed = f(msg);
                    if changed {
                        session.touch();
                    }
                    changed
                }
                None => false,
            },
            None => false,
        }
    }

    // ─── Import / export ─────────────────────────────────────

    /// Serialize one session, pretty-printed, for download.
    pub fn export_session(&self, id: &str) -> Result<String> {
        let data = self.data.borrow();
        let session = data
            .sessions
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| AssistantError::Validation(format!("session not found: {}", id)))?;
        Ok(serde_json::to_string_pretty(session)?)
    }

    /// Parse a single exported session and adopt it: a fresh id (imported
    /// ids are never trusted), a fresh `lastUpdated`, and an import marker
    /// on the title. The session is prepended and activated.
    pub async fn import_session(&self, serialized: &str) -> Result<Session> {
        let value: Value = serde_json::from_str(serialized)
            .map_err(|e| AssistantError::Validation(format!("not valid JSON: {}", e)))?;
        if !value.get("messages").is_some_and(Value::is_array) {
            return Err(AssistantError::Validation(
                "chat data must contain a messages array".to_string(),
            ));
        }
        let mut session: Session = serde_json::from_value(value)
            .map_err(|e| AssistantError::Validation(format!("unreadable chat data: {}", e)))?;

        session.id = uuid::Uuid::new_v4().to_string();
        session.last_updated = wikichat_types::now_millis();
        let base_title = if session.title.is_empty() {
            "Untitled".to_string()
        } else {
            session.title
        };
        session.title = format!("{}{}", IMPORT_TITLE_PREFIX, base_title);
        for msg in &mut session.messages {
            msg.normalize();
        }

        {
            let mut data = self.data.borrow_mut();
            data.active_session_id = Some(session.id.clone());
            data.sessions.insert(0, session.clone());
        }
        self.flush().await;
        self.notify();
        Ok(session)
    }

    /// Serialize the entire collection.
    pub fn export_all(&self) -> Result<String> {
        Ok(serde_json::to_string(&*self.data.borrow())?)
    }

    /// Replace the collection wholesale. A payload without a top-level
    /// `sessions` array leaves the current state untouched.
    pub async fn import_all(&self, serialized: &str) -> Result<()> {
        let value: Value = serde_json::from_str(serialized)
            .map_err(|e| AssistantError::Validation(format!("not valid JSON: {}", e)))?;
        if !value.get("sessions").is_some_and(Value::is_array) {
            return Err(AssistantError::Validation(
                "backup must contain a sessions array".to_string(),
            ));
        }
        let mut collection: SessionCollection = serde_json::from_value(value)
            .map_err(|e| AssistantError::Validation(format!("unreadable backup: {}", e)))?;
        for session in &mut collection.sessions {
            for msg in &mut session.messages {
                msg.normalize();
            }
        }

        {
            let mut data = self.data.borrow_mut();
            *data = collection;
            Self::ensure_invariants(&mut data);
        }
        self.flush().await;
        self.notify();
        Ok(())
    }

    // ─── Persistence ─────────────────────────────────────────

    async fn flush(&self) {
        let bytes = {
            let data = self.data.borrow();
            serde_json::to_vec(&*data)
        };
        match bytes {
            Ok(bytes) => {
                if let Err(e) = self.storage.set(SESSIONS_KEY, &bytes).await {
                    log::warn!("session save failed: {}", e);
                }
            }
            Err(e) => log::warn!("session serialization failed: {}", e),
        }
    }

    fn notify(&self) {
        self.events.emit(AssistantEvent::SessionsChanged);
    }
}
