//! Fetch-based HTTP transport with cooperative cancellation.
//!
//! The in-flight call races against a watch on the cancel token; when the
//! token fires, the browser-side AbortController tears the socket down and
//! the call resolves to `Cancelled`. The response body is JSON-parsed
//! regardless of HTTP status so provider error envelopes reach the adapter
//! verbatim; only an unparseable body becomes a plain transport error.

use async_trait::async_trait;
use futures::future::{select, Either};
use gloo_net::http::Request;
use gloo_timers::future::TimeoutFuture;
use serde_json::Value;
use web_sys::AbortController;

use wikichat_core::ports::{CancelToken, HttpPort, ProviderRequest};
use wikichat_types::{AssistantError, Result};

/// Poll interval for the cancel-token watch, in milliseconds.
const CANCEL_POLL_MS: u32 = 50;

pub struct FetchHttp;

impl FetchHttp {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FetchHttp {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl HttpPort for FetchHttp {
    async fn post_json(&self, req: &ProviderRequest, cancel: &CancelToken) -> Result<Value> {
        let controller = AbortController::new()
            .map_err(|e| AssistantError::Transport(format!("{:?}", e)))?;

        let fetch = do_post(req, &controller);
        let watch = watch_cancel(cancel);
        futures::pin_mut!(fetch, watch);

        match select(fetch, watch).await {
            Either::Left((result, _)) => {
                // An abort that raced the response still counts as a stop.
                if cancel.is_cancelled() {
                    return Err(AssistantError::Cancelled);
                }
                result
            }
            Either::Right(((), _)) => {
                controller.abort();
                Err(AssistantError::Cancelled)
            }
        }
    }
}

async fn do_post(req: &ProviderRequest, controller: &AbortController) -> Result<Value> {
    let mut builder = Request::post(&req.url).abort_signal(Some(&controller.signal()));
    for (name, value) in &req.headers {
        builder = builder.header(name, value);
    }

    let response = builder
        .json(&req.body)
        .map_err(|e| AssistantError::Transport(e.to_string()))?
        .send()
        .await
        .map_err(|e| AssistantError::Transport(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| AssistantError::Transport(e.to_string()))?;

    match serde_json::from_str(&text) {
        Ok(value) => Ok(value),
        Err(_) if !(200..300).contains(&status) => Err(AssistantError::Transport(format!(
            "HTTP {}: {}",
            status,
            text.chars().take(200).collect::<String>()
        ))),
        Err(e) => Err(AssistantError::Transport(format!(
            "invalid JSON response: {}",
            e
        ))),
    }
}

async fn watch_cancel(cancel: &CancelToken) {
    while !cancel.is_cancelled() {
        TimeoutFuture::new(CANCEL_POLL_MS).await;
    }
}
