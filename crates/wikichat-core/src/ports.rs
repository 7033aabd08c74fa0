//! Port traits — the boundary between the pure core and the browser.
//!
//! These traits are defined here in `wikichat-core` (pure Rust).
//! Implementations live in `wikichat-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use std::cell::Cell;
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::Value;
use wikichat_types::Result;

// ─── Cancellation ────────────────────────────────────────────

/// Cooperative cancellation token for the single in-flight generation.
///
/// Owned by the generation controller, handed to the HTTP port for the
/// duration of one call, and cleared exactly once per lifecycle. Cloning
/// shares the underlying flag.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Rc<Cell<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.get()
    }
}

// ─── HTTP Port ───────────────────────────────────────────────

/// A fully built provider call: URL, headers, JSON body.
/// Produced by a [`crate::providers::ProviderAdapter`], consumed by the
/// HTTP port.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

#[async_trait(?Send)]
pub trait HttpPort {
    /// POST the body as JSON and parse the response body as JSON.
    ///
    /// The response is parsed regardless of HTTP status so provider error
    /// envelopes reach the adapter verbatim; a body that is not JSON is a
    /// transport error. Must resolve to `Err(Cancelled)` when the token
    /// fires mid-flight.
    async fn post_json(&self, req: &ProviderRequest, cancel: &CancelToken) -> Result<Value>;
}

// ─── Storage Port ────────────────────────────────────────────

#[async_trait(?Send)]
pub trait StoragePort {
    /// Get a value by key
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Set a value
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete a value
    async fn delete(&self, key: &str) -> Result<()>;

    /// List keys with a given prefix
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Name of this backend (for logging/debug)
    fn backend_name(&self) -> &str;
}

// ─── Context Port ────────────────────────────────────────────

/// Supplies the wiki's command/macro reference text used to ground the
/// assistant. Invoked once per generation call; an absent provider
/// degrades to the empty string.
pub trait ContextPort {
    fn wiki_context(&self) -> String;
}
