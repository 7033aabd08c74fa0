//! Settings persistence — provider/model selection, per-provider API keys,
//! the token limit, and user-defined custom model entries.
//!
//! Each setting lives under its own storage key so partial writes are
//! cheap; unreadable values fall back to defaults.

use std::rc::Rc;

use wikichat_types::config::DEFAULT_MAX_TOKENS;
use wikichat_types::provider::{CustomModel, ProviderKey};
use wikichat_types::{AssistantError, Result};

use crate::ports::StoragePort;

pub const PROVIDER_KEY: &str = "wikichat:provider";
pub const MODEL_KEY: &str = "wikichat:model";
pub const MAX_TOKENS_KEY: &str = "wikichat:max-tokens";
pub const CUSTOM_MODELS_KEY: &str = "wikichat:custom-models:v1";

/// Storage key for one provider's API key.
pub fn api_key_storage_key(provider: ProviderKey) -> String {
    format!("wikichat:api-key:{}", provider.key())
}

/// The persisted settings snapshot (API keys are loaded per provider on
/// demand, not as part of this struct).
#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: ProviderKey,
    pub model: String,
    pub max_tokens: u32,
    pub custom_models: Vec<CustomModel>,
}

impl Default for Settings {
    fn default() -> Self {
        let provider = ProviderKey::OpenAi;
        Self {
            provider,
            model: default_model(provider),
            max_tokens: DEFAULT_MAX_TOKENS,
            custom_models: Vec::new(),
        }
    }
}

fn default_model(provider: ProviderKey) -> String {
    provider
        .known_models()
        .first()
        .copied()
        .unwrap_or_default()
        .to_string()
}

pub struct SettingsStore {
    storage: Rc<dyn StoragePort>,
}

impl SettingsStore {
    pub fn new(storage: Rc<dyn StoragePort>) -> Self {
        Self { storage }
    }

    pub async fn load(&self) -> Settings {
        let provider = match self.get_string(PROVIDER_KEY).await {
            Some(stored) => ProviderKey::all()
                .iter()
                .copied()
                .find(|p| p.key() == stored)
                .unwrap_or(ProviderKey::OpenAi),
            None => ProviderKey::OpenAi,
        };
        let model = match self.get_string(MODEL_KEY).await {
            Some(m) if !m.is_empty() => m,
            _ => default_model(provider),
        };
        let max_tokens = self
            .get_string(MAX_TOKENS_KEY)
            .await
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);
        Settings {
            provider,
            model,
            max_tokens,
            custom_models: self.custom_models().await,
        }
    }

    pub async fn save_provider(&self, provider: ProviderKey) {
        self.set_string(PROVIDER_KEY, provider.key()).await;
    }

    pub async fn save_model(&self, model: &str) {
        self.set_string(MODEL_KEY, model).await;
    }

    pub async fn save_max_tokens(&self, max_tokens: u32) {
        self.set_string(MAX_TOKENS_KEY, &max_tokens.to_string())
            .await;
    }

    pub async fn api_key(&self, provider: ProviderKey) -> String {
        self.get_string(&api_key_storage_key(provider))
            .await
            .unwrap_or_default()
    }

    pub async fn save_api_key(&self, provider: ProviderKey, key: &str) {
        self.set_string(&api_key_storage_key(provider), key.trim())
            .await;
    }

    pub async fn custom_models(&self) -> Vec<CustomModel> {
        match self.get_string(CUSTOM_MODELS_KEY).await {
            Some(json) => serde_json::from_str(&json).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Add a user-defined model. Duplicate names are rejected so the model
    /// picker stays unambiguous.
    pub async fn add_custom_model(&self, model: CustomModel) -> Result<()> {
        let mut models = self.custom_models().await;
        if models.iter().any(|m| m.name == model.name) {
            return Err(AssistantError::Validation(format!(
                "a model named \"{}\" already exists",
                model.name
            )));
        }
        models.push(model);
        self.save_custom_models(&models).await;
        Ok(())
    }

    pub async fn remove_custom_model(&self, name: &str) {
        let mut models = self.custom_models().await;
        models.retain(|m| m.name != name);
        self.save_custom_models(&models).await;
    }

    async fn save_custom_models(&self, models: &[CustomModel]) {
        match serde_json::to_string(models) {
            Ok(json) => self.set_string(CUSTOM_MODELS_KEY, &json).await,
            Err(e) => log::warn!("custom model serialization failed: {}", e),
        }
    }

    // ─── Raw string helpers over the blob port ───────────────

    async fn get_string(&self, key: &str) -> Option<String> {
        match self.storage.get(key).await {
            Ok(Some(bytes)) => String::from_utf8(bytes).ok(),
            Ok(None) => None,
            Err(e) => {
                log::warn!("settings read failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn set_string(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.set(key, value.as_bytes()).await {
            log::warn!("settings write failed for {}: {}", key, e);
        }
    }
}
