use serde::{Deserialize, Serialize};

/// Events emitted by the store and the generation controller.
/// The UI drains these each frame for reactive updates; it owns no
/// derived conversation state of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AssistantEvent {
    /// A generation call entered the Generating state
    GenerationStarted,

    /// The upstream call completed and the result was written back
    GenerationFinished { text: String },

    /// The call failed; shown as a transient assistant-style error bubble,
    /// never persisted as a turn
    GenerationFailed { message: String },

    /// The user stopped the in-flight call. Fully silent: no error, no turn.
    GenerationCancelled,

    /// Sessions or messages changed; re-read the store
    SessionsChanged,

    /// A non-generation operation (import, export) failed
    OperationFailed { message: String },
}
