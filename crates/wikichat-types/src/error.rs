use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum AssistantError {
    /// Bad input: malformed import data, empty prompt
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or unusable configuration, e.g. no API key
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network failure, malformed provider response, or a provider-reported
    /// error (the provider's own message is preserved verbatim)
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// User-initiated stop — not a failure, surfaced silently
    #[error("Cancelled")]
    Cancelled,
}

impl From<serde_json::Error> for AssistantError {
    fn from(e: serde_json::Error) -> Self {
        AssistantError::Serialization(e.to_string())
    }
}
