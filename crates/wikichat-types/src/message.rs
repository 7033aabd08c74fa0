use serde::{Deserialize, Serialize};

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    /// Earlier versions of the widget persisted this role as `"bot"`;
    /// exports from them still deserialize.
    #[serde(alias = "bot")]
    Assistant,
}

/// A single turn in a conversation.
///
/// Assistant turns keep every generated variant in `swipes`; `content`
/// always mirrors `swipes[swipe_index]`. User turns have exactly one swipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub swipes: Vec<String>,
    pub swipe_index: usize,
    /// Creation time in unix millis. Not updated when swiping.
    pub timestamp: i64,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            role,
            swipes: vec![content.clone()],
            swipe_index: 0,
            content,
            timestamp: crate::now_millis(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// Append a regenerated variant and make it current.
    pub fn append_swipe(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.swipes.push(text.clone());
        self.swipe_index = self.swipes.len() - 1;
        self.content = text;
    }

    /// Select an existing variant. Out-of-bounds indices are ignored.
    pub fn select_swipe(&mut self, index: usize) -> bool {
        if index >= self.swipes.len() {
            return false;
        }
        self.swipe_index = index;
        self.content = self.swipes[index].clone();
        true
    }

    /// Rewrite the currently selected variant in place.
    pub fn edit_current(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.swipes[self.swipe_index] = text.clone();
        self.content = text;
    }

    /// Repair a message loaded from untrusted data so the swipe invariant
    /// holds: non-empty swipes, in-bounds index, content in sync.
    pub fn normalize(&mut self) {
        if self.swipes.is_empty() {
            self.swipes = vec![self.content.clone()];
        }
        if self.swipe_index >= self.swipes.len() {
            self.swipe_index = self.swipes.len() - 1;
        }
        self.content = self.swipes[self.swipe_index].clone();
    }
}
