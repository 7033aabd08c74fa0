//! Provider adapters — request construction and response normalization for
//! each upstream wire shape.
//!
//! Each adapter is a pair of pure functions: build the outgoing
//! `{url, headers, body}` and extract the assistant text from the
//! provider-specific response envelope. The generation controller depends
//! only on the [`ProviderAdapter`] trait; adding a provider means adding
//! one adapter here and one [`ProviderKey`] variant.

use serde_json::{json, Value};

use wikichat_types::config::GenerationConfig;
use wikichat_types::message::{Message, Role};
use wikichat_types::provider::ProviderKey;
use wikichat_types::{AssistantError, Result};

use crate::ports::ProviderRequest;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Prefix for the synthetic leading user turn that carries system
/// instructions on the Google wire, which has no system role.
const GOOGLE_SYSTEM_PREFIX: &str = "[System Instruction]\n";

pub trait ProviderAdapter {
    fn display_name(&self) -> &'static str;

    /// Build the outgoing HTTP call. `history` is the bounded window,
    /// oldest first; `question` is the live user prompt, appended last.
    fn build_request(
        &self,
        history: &[Message],
        question: &str,
        system_context: &str,
        cfg: &GenerationConfig,
    ) -> ProviderRequest;

    /// Extract the assistant text from the response envelope. An `error`
    /// field surfaces as a transport error carrying the provider's own
    /// message verbatim; a missing text path is a malformed response.
    fn parse_response(&self, raw: &Value) -> Result<String>;
}

/// Pure lookup from provider key to adapter.
pub fn adapter_for(key: ProviderKey) -> &'static dyn ProviderAdapter {
    match key {
        ProviderKey::OpenAi => &OPENAI,
        ProviderKey::Anthropic => &ANTHROPIC,
        ProviderKey::Google => &GOOGLE,
        // Cohere and Custom speak the OpenAI chat-completions protocol.
        ProviderKey::Cohere => &COHERE,
        ProviderKey::Custom => &CUSTOM,
    }
}

static OPENAI: OpenAiStyleAdapter = OpenAiStyleAdapter { name: "OpenAI" };
static COHERE: OpenAiStyleAdapter = OpenAiStyleAdapter { name: "Cohere" };
static CUSTOM: OpenAiStyleAdapter = OpenAiStyleAdapter { name: "Custom" };
static ANTHROPIC: AnthropicAdapter = AnthropicAdapter;
static GOOGLE: GoogleAdapter = GoogleAdapter;

// ─── Shared helpers ──────────────────────────────────────────

/// Append the chat-completions suffix unless the endpoint already ends
/// with it. Custom endpoints are otherwise used verbatim.
fn completions_url(endpoint: &str) -> String {
    if endpoint.ends_with("/chat/completions") {
        endpoint.to_string()
    } else {
        format!("{}/chat/completions", endpoint.trim_end_matches('/'))
    }
}

/// Surface a provider error envelope, preserving its message verbatim.
fn check_error_envelope(raw: &Value) -> Result<()> {
    match raw.get("error") {
        None | Some(Value::Null) => Ok(()),
        Some(err) => {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string());
            Err(AssistantError::Transport(message))
        }
    }
}

fn malformed(provider: &str) -> AssistantError {
    AssistantError::Transport(format!("malformed {} response", provider))
}

// ─── OpenAI-style (OpenAI, Cohere, Custom) ───────────────────

struct OpenAiStyleAdapter {
    name: &'static str,
}

impl ProviderAdapter for OpenAiStyleAdapter {
    fn display_name(&self) -> &'static str {
        self.name
    }

    fn build_request(
        &self,
        history: &[Message],
        question: &str,
        system_context: &str,
        cfg: &GenerationConfig,
    ) -> ProviderRequest {
        let mut messages = vec![json!({"role": "system", "content": system_context})];
        messages.extend(history.iter().map(|m| {
            json!({
                "role": match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                "content": m.content,
            })
        }));
        messages.push(json!({"role": "user", "content": question}));

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        // Custom self-hosted servers may run without auth.
        if !cfg.api_key.is_empty() {
            headers.push((
                "Authorization".to_string(),
                format!("Bearer {}", cfg.api_key),
            ));
        }

        ProviderRequest {
            url: completions_url(cfg.effective_endpoint()),
            headers,
            body: json!({
                "model": cfg.model,
                "max_tokens": cfg.max_tokens,
                "messages": messages,
            }),
        }
    }

    fn parse_response(&self, raw: &Value) -> Result<String> {
        check_error_envelope(raw)?;
        raw.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| malformed(self.name))
    }
}

// ─── Anthropic ───────────────────────────────────────────────

struct AnthropicAdapter;

impl ProviderAdapter for AnthropicAdapter {
    fn display_name(&self) -> &'static str {
        "Anthropic"
    }

    fn build_request(
        &self,
        history: &[Message],
        question: &str,
        system_context: &str,
        cfg: &GenerationConfig,
    ) -> ProviderRequest {
        let mut messages: Vec<Value> = history
            .iter()
            .map(|m| {
                json!({
                    "role": match m.role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    "content": m.content,
                })
            })
            .collect();
        messages.push(json!({"role": "user", "content": question}));

        ProviderRequest {
            url: format!(
                "{}/messages",
                cfg.effective_endpoint().trim_end_matches('/')
            ),
            headers: vec![
                ("x-api-key".to_string(), cfg.api_key.clone()),
                ("anthropic-version".to_string(), ANTHROPIC_VERSION.to_string()),
                ("content-type".to_string(), "application/json".to_string()),
                // Required for direct calls from a browser origin.
                ("dangerously-allow-browser".to_string(), "true".to_string()),
            ],
            body: json!({
                "model": cfg.model,
                "max_tokens": cfg.max_tokens,
                // The system prompt is a top-level field, not a message.
                "system": system_context,
                "messages": messages,
            }),
        }
    }

    fn parse_response(&self, raw: &Value) -> Result<String> {
        check_error_envelope(raw)?;
        raw.pointer("/content/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| malformed("Anthropic"))
    }
}

// ─── Google ──────────────────────────────────────────────────

struct GoogleAdapter;

impl ProviderAdapter for GoogleAdapter {
    fn display_name(&self) -> &'static str {
        "Google Gemini"
    }

    fn build_request(
        &self,
        history: &[Message],
        question: &str,
        system_context: &str,
        cfg: &GenerationConfig,
    ) -> ProviderRequest {
        let mut contents = vec![json!({
            "role": "user",
            "parts": [{"text": format!("{}{}", GOOGLE_SYSTEM_PREFIX, system_context)}],
        })];
        contents.extend(history.iter().map(|m| {
            json!({
                // Google has no "assistant" role on the wire.
                "role": match m.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                },
                "parts": [{"text": m.content}],
            })
        }));
        contents.push(json!({"role": "user", "parts": [{"text": question}]}));

        ProviderRequest {
            // Auth rides in the query string, not a header.
            url: format!(
                "{}/{}:generateContent?key={}",
                cfg.effective_endpoint().trim_end_matches('/'),
                cfg.model,
                cfg.api_key,
            ),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: json!({
                "contents": contents,
                "generationConfig": {"maxOutputTokens": cfg.max_tokens},
            }),
        }
    }

    fn parse_response(&self, raw: &Value) -> Result<String> {
        check_error_envelope(raw)?;
        raw.pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| malformed("Google"))
    }
}
