//! Bridge to the host page's context callback.
//!
//! The wiki page installs a zero-argument function (e.g.
//! `window.wikiContext`) that returns the command/macro reference text.
//! A missing or failing callback degrades to the empty string — the
//! assistant still answers, just without grounding.

use wasm_bindgen::{JsCast, JsValue};

use wikichat_core::ports::ContextPort;

pub struct JsContext {
    callback: js_sys::Function,
}

impl JsContext {
    pub fn new(callback: js_sys::Function) -> Self {
        Self { callback }
    }

    /// Look up a global function installed by the host page.
    pub fn from_window(name: &str) -> Option<Self> {
        let window = web_sys::window()?;
        let value = js_sys::Reflect::get(&window, &JsValue::from_str(name)).ok()?;
        value.dyn_into::<js_sys::Function>().ok().map(Self::new)
    }
}

impl ContextPort for JsContext {
    fn wiki_context(&self) -> String {
        match self.callback.call0(&JsValue::NULL) {
            Ok(value) => value.as_string().unwrap_or_default(),
            Err(e) => {
                log::warn!("wiki context callback failed: {:?}", e);
                String::new()
            }
        }
    }
}
