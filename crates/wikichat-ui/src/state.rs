//! UI-level state that drives rendering.
//!
//! A read-only projection of core state, updated each frame by draining
//! the event bus. Conversation data itself is always re-read from the
//! store; nothing here owns message state.

use wikichat_types::config::{GenerationConfig, DEFAULT_MAX_TOKENS};
use wikichat_types::event::AssistantEvent;
use wikichat_types::provider::{CustomModel, ProviderKey};

/// State for the chat and sidebar panels
pub struct UiState {
    pub input_text: String,
    /// A generation is in flight (send button shows Stop)
    pub busy: bool,
    /// Transient assistant-style error bubble; never persisted as a turn
    pub transient_error: Option<String>,
    pub show_settings: bool,
    pub show_sidebar: bool,
    /// Paste buffer for the sidebar import box
    pub import_text: String,
    pub show_import: bool,
    pub status_text: String,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            input_text: String::new(),
            busy: false,
            transient_error: None,
            show_settings: false,
            show_sidebar: true,
            import_text: String::new(),
            show_import: false,
            status_text: "Ready".to_string(),
        }
    }

    /// Process events from the bus and update the projection.
    pub fn process_events(&mut self, events: Vec<AssistantEvent>) {
        for event in events {
            match event {
                AssistantEvent::GenerationStarted => {
                    self.busy = true;
                    self.transient_error = None;
                    self.status_text = "Thinking...".to_string();
                }
                AssistantEvent::GenerationFinished { .. } => {
                    self.busy = false;
                    self.status_text = "Ready".to_string();
                }
                AssistantEvent::GenerationFailed { message } => {
                    self.busy = false;
                    self.transient_error = Some(message);
                    self.status_text = "Error".to_string();
                }
                AssistantEvent::GenerationCancelled => {
                    // Silent: no error bubble, just back to idle.
                    self.busy = false;
                    self.status_text = "Ready".to_string();
                }
                AssistantEvent::SessionsChanged => {}
                AssistantEvent::OperationFailed { message } => {
                    self.transient_error = Some(message);
                }
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

/// Editable settings snapshot backing the settings panel. The app layer
/// loads it from the settings store and persists changes as they happen.
pub struct SettingsState {
    pub provider: ProviderKey,
    pub model: String,
    /// The key field content for the selected provider. Read at dispatch
    /// time; persisted only via the explicit save button.
    pub api_key: String,
    pub max_tokens: u32,
    pub custom_models: Vec<CustomModel>,
    pub new_model_name: String,
    pub new_model_endpoint: String,
    pub show_add_model: bool,
}

impl SettingsState {
    pub fn new() -> Self {
        let provider = ProviderKey::OpenAi;
        Self {
            provider,
            model: provider
                .known_models()
                .first()
                .copied()
                .unwrap_or_default()
                .to_string(),
            api_key: String::new(),
            max_tokens: DEFAULT_MAX_TOKENS,
            custom_models: Vec::new(),
            new_model_name: String::new(),
            new_model_endpoint: String::new(),
            show_add_model: false,
        }
    }

    /// Model names offered for the selected provider.
    pub fn model_choices(&self) -> Vec<String> {
        if self.provider == ProviderKey::Custom {
            self.custom_models.iter().map(|m| m.name.clone()).collect()
        } else {
            self.provider
                .known_models()
                .iter()
                .map(|m| m.to_string())
                .collect()
        }
    }

    /// The generation config a dispatch should use right now.
    pub fn generation_config(&self) -> GenerationConfig {
        let endpoint = if self.provider == ProviderKey::Custom {
            self.custom_models
                .iter()
                .find(|m| m.name == self.model)
                .map(|m| m.endpoint.clone())
        } else {
            None
        };
        GenerationConfig {
            provider: self.provider,
            model: self.model.clone(),
            api_key: self.api_key.trim().to_string(),
            endpoint,
            max_tokens: self.max_tokens,
        }
    }
}

impl Default for SettingsState {
    fn default() -> Self {
        Self::new()
    }
}
