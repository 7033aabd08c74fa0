use serde::{Deserialize, Serialize};

use crate::provider::ProviderKey;

/// Token limit used when the stored slider value is missing or unparseable.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Everything a single generation call needs to know about the upstream
/// provider. Assembled from settings at dispatch time; never persisted as
/// one blob (keys are stored per provider, see the settings store).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub provider: ProviderKey,
    pub model: String,
    pub api_key: String,
    /// Overrides the provider's default endpoint. Required for Custom
    /// (taken from the selected custom model entry), optional elsewhere.
    pub endpoint: Option<String>,
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKey::OpenAi,
            model: "gpt-4o-mini".to_string(),
            api_key: String::new(),
            endpoint: None,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl GenerationConfig {
    /// Endpoint to dispatch against: the override when set, else the
    /// provider default.
    pub fn effective_endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| self.provider.default_endpoint())
    }
}
