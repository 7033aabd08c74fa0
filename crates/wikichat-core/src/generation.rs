//! Generation lifecycle — one cancellable upstream call at a time.
//!
//! State machine: Idle → Generating → {completed, cancelled, failed} → Idle.
//! A `generate` call that arrives while one is in flight acts as a stop
//! request. The cancel token is the only shared mutable between the start
//! and stop paths; it is cleared exactly once per lifecycle.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wikichat_types::config::GenerationConfig;
use wikichat_types::event::AssistantEvent;
use wikichat_types::message::{Message, Role};
use wikichat_types::provider::ProviderKey;
use wikichat_types::session::Session;
use wikichat_types::{AssistantError, Result};

use crate::event_bus::EventBus;
use crate::ports::{CancelToken, ContextPort, HttpPort};
use crate::providers::adapter_for;
use crate::store::ConversationStore;

/// How many recent messages ride along as conversational context.
const HISTORY_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Generating,
}

/// What the caller asked for.
#[derive(Debug, Clone)]
pub enum GenerationRequest {
    /// A fresh user prompt, appended as a new user turn.
    Send { question: String },
    /// Regenerate: append a swipe to the assistant turn at `target`
    /// (an index into the active session's messages).
    Reroll { target: usize },
}

/// How a lifecycle ended. Pre-flight rejections (empty prompt, missing
/// API key) are `Err` instead — they never enter the Generating state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed,
    /// User-initiated stop: silent, nothing persisted.
    Cancelled,
    /// Upstream failure; the error text was surfaced through the event bus
    /// as a transient assistant-style entry, never persisted.
    Failed,
    /// The call found a generation already in flight and stopped it
    /// instead of starting a new one.
    StopRequested,
}

pub struct GenerationController {
    store: Rc<ConversationStore>,
    http: Rc<dyn HttpPort>,
    context: Option<Rc<dyn ContextPort>>,
    events: EventBus,
    phase: Cell<Phase>,
    cancel: RefCell<Option<CancelToken>>,
    last_prompt: RefCell<Option<String>>,
}

impl GenerationController {
    pub fn new(
        store: Rc<ConversationStore>,
        http: Rc<dyn HttpPort>,
        context: Option<Rc<dyn ContextPort>>,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            http,
            context,
            events,
            phase: Cell::new(Phase::Idle),
            cancel: RefCell::new(None),
            last_prompt: RefCell::new(None),
        }
    }

    pub fn is_generating(&self) -> bool {
        self.phase.get() == Phase::Generating
    }

    /// Cancel the in-flight call, if any. The suspended `generate` future
    /// observes the token and resolves to `Cancelled`.
    pub fn request_stop(&self) {
        if let Some(token) = self.cancel.borrow().as_ref() {
            token.cancel();
        }
    }

    /// Run one generation lifecycle against the active session.
    pub async fn generate(
        &self,
        cfg: &GenerationConfig,
        request: GenerationRequest,
    ) -> Result<GenerationOutcome> {
        // A second invocation while generating is a stop request.
        if self.is_generating() {
            self.request_stop();
            return Ok(GenerationOutcome::StopRequested);
        }

        let is_reroll = matches!(request, GenerationRequest::Reroll { .. });
        let session = self.store.active();

        // Resolve the question before any state transition.
        let question = match &request {
            GenerationRequest::Send { question } => {
                let trimmed = question.trim();
                if trimmed.is_empty() {
                    return Err(AssistantError::Validation("empty prompt".to_string()));
                }
                let trimmed = trimmed.to_string();
                *self.last_prompt.borrow_mut() = Some(trimmed.clone());
                trimmed
            }
            GenerationRequest::Reroll { .. } => {
                let cached = self.last_prompt.borrow().clone();
                match cached.or_else(|| last_user_prompt(&session)) {
                    Some(q) => q,
                    None => {
                        return Err(AssistantError::Validation(
                            "no user prompt to regenerate".to_string(),
                        ))
                    }
                }
            }
        };

        // Fail fast when no key is configured; only the self-hosted custom
        // kind may run without auth.
        if cfg.api_key.is_empty() && cfg.provider != ProviderKey::Custom {
            return Err(AssistantError::Config(
                "no API key configured for this provider".to_string(),
            ));
        }

        // Enter Generating. From here every exit path must clear the token
        // and return to Idle.
        self.phase.set(Phase::Generating);
        let token = CancelToken::new();
        *self.cancel.borrow_mut() = Some(token.clone());
        self.events.emit(AssistantEvent::GenerationStarted);

        // The window is built from the pre-send conversation; the live
        // question rides separately at the end of the request.
        let history = history_window(&session, &question, is_reroll);

        if let GenerationRequest::Send { .. } = &request {
            self.store.append_message(Role::User, &question).await;
        }

        let system_context = self
            .context
            .as_ref()
            .map(|c| c.wiki_context())
            .unwrap_or_default();

        let adapter = adapter_for(cfg.provider);
        let provider_request = adapter.build_request(&history, &question, &system_context, cfg);
        log::info!(
            "dispatching to {} ({})",
            adapter.display_name(),
            cfg.model
        );

        let result = match self.http.post_json(&provider_request, &token).await {
            Ok(raw) => adapter.parse_response(&raw),
            Err(e) => Err(e),
        };

        let outcome = match result {
            // A completion that raced a stop request is discarded.
            _ if token.is_cancelled() => {
                self.events.emit(AssistantEvent::GenerationCancelled);
                GenerationOutcome::Cancelled
            }
            Ok(text) => {
                match &request {
                    GenerationRequest::Send { .. } => {
                        self.store.append_message(Role::Assistant, &text).await;
                    }
                    GenerationRequest::Reroll { target } => {
                        self.commit_reroll(*target, &text).await;
                    }
                }
                self.events
                    .emit(AssistantEvent::GenerationFinished { text });
                GenerationOutcome::Completed
            }
            Err(AssistantError::Cancelled) => {
                self.events.emit(AssistantEvent::GenerationCancelled);
                GenerationOutcome::Cancelled
            }
            Err(e) => {
                let message = match &e {
                    AssistantError::Transport(m) => m.clone(),
                    other => other.to_string(),
                };
                log::warn!("generation failed: {}", message);
                self.events
                    .emit(AssistantEvent::GenerationFailed { message });
                GenerationOutcome::Failed
            }
        };

        *self.cancel.borrow_mut() = None;
        self.phase.set(Phase::Idle);
        Ok(outcome)
    }

    /// Write a reroll result back: the new text becomes a fresh swipe on
    /// the target turn and the current selection.
    async fn commit_reroll(&self, target: usize, text: &str) {
        let session = self.store.active();
        let Some(msg) = session.messages.get(target) else {
            log::warn!("reroll target {} out of bounds, dropping result", target);
            return;
        };
        let mut swipes = msg.swipes.clone();
        swipes.push(text.to_string());
        let index = swipes.len() - 1;
        self.store
            .commit_assistant_variant(text, swipes, index)
            .await;
    }
}

/// The most recent user prompt of a session, scanning backwards.
fn last_user_prompt(session: &Session) -> Option<String> {
    session
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.clone())
}

/// The bounded slice of recent conversation sent upstream, oldest first.
///
/// Rerolls drop the trailing assistant turn (it is the variant being
/// replaced, not prior context), and any entry equal to the live question
/// is excluded to prevent a duplicate echo.
pub fn history_window(session: &Session, question: &str, is_reroll: bool) -> Vec<Message> {
    let messages = &session.messages;
    let start = messages.len().saturating_sub(HISTORY_WINDOW);
    let mut window = &messages[start..];
    if is_reroll {
        if let Some(last) = window.last() {
            if last.role == Role::Assistant {
                window = &window[..window.len() - 1];
            }
        }
    }
    window
        .iter()
        .filter(|m| m.content != question)
        .cloned()
        .collect()
}
