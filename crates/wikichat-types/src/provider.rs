use serde::{Deserialize, Serialize};

/// The provider families the widget can talk to.
///
/// OpenAi, Cohere, and Custom share the OpenAI chat-completions wire shape;
/// Anthropic and Google each have their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKey {
    OpenAi,
    Anthropic,
    Google,
    Cohere,
    Custom,
}

impl ProviderKey {
    pub fn all() -> &'static [ProviderKey] {
        &[
            ProviderKey::OpenAi,
            ProviderKey::Anthropic,
            ProviderKey::Google,
            ProviderKey::Cohere,
            ProviderKey::Custom,
        ]
    }

    /// Stable key used in storage namespacing and lookups.
    pub fn key(&self) -> &'static str {
        match self {
            ProviderKey::OpenAi => "openai",
            ProviderKey::Anthropic => "anthropic",
            ProviderKey::Google => "google",
            ProviderKey::Cohere => "cohere",
            ProviderKey::Custom => "custom",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProviderKey::OpenAi => "OpenAI",
            ProviderKey::Anthropic => "Anthropic",
            ProviderKey::Google => "Google Gemini",
            ProviderKey::Cohere => "Cohere",
            ProviderKey::Custom => "Custom",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKey::OpenAi => "https://api.openai.com/v1",
            ProviderKey::Anthropic => "https://api.anthropic.com/v1",
            ProviderKey::Google => "https://generativelanguage.googleapis.com/v1beta/models",
            ProviderKey::Cohere => "https://api.cohere.ai/v1",
            ProviderKey::Custom => "",
        }
    }

    /// Built-in model catalogue shown in the model picker. Custom entries
    /// come from user-defined [`CustomModel`]s instead.
    pub fn known_models(&self) -> &'static [&'static str] {
        match self {
            ProviderKey::OpenAi => &[
                "gpt-5",
                "gpt-5-mini",
                "gpt-5-nano",
                "o1-preview",
                "o1-mini",
                "gpt-4o",
                "gpt-4o-2024-11-20",
                "chatgpt-4o-latest",
                "gpt-4o-mini",
                "gpt-4-turbo-preview",
                "gpt-4",
                "gpt-3.5-turbo",
            ],
            ProviderKey::Anthropic => &[
                "claude-opus-4-20250514",
                "claude-4-sonnet-20250514",
                "claude-3-7-sonnet-latest",
                "claude-3-5-sonnet-latest",
                "claude-3-5-sonnet-20241022",
                "claude-3-5-haiku-20241022",
                "claude-3-opus-20240229",
                "claude-3-haiku-20240307",
            ],
            ProviderKey::Google => &[
                "gemini-2.5-pro",
                "gemini-2.5-flash",
                "gemini-2.0-flash",
                "gemini-2.0-flash-exp",
                "gemini-1.5-pro",
                "gemini-1.5-flash",
                "gemini-1.5-flash-8b",
                "gemma-3-27b-it",
            ],
            ProviderKey::Cohere => &[
                "command-a-03-2025",
                "command-r-plus",
                "command-r-plus-08-2024",
                "command-r",
                "c4ai-aya-expanse-32b",
            ],
            ProviderKey::Custom => &[],
        }
    }
}

/// A user-defined model entry for self-hosted or OpenAI-compatible servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomModel {
    pub name: String,
    /// Endpoint used verbatim (the completions suffix is appended when
    /// absent).
    pub endpoint: String,
}
