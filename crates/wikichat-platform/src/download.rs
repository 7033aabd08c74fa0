//! Trigger a browser download of an exported JSON document.
//!
//! Same mechanism a plain web page would use: wrap the text in a Blob,
//! mint an object URL, click a synthetic anchor, clean up.

use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Url};

use wikichat_types::{AssistantError, Result};

pub fn download_json(file_name: &str, contents: &str) -> Result<()> {
    let window =
        web_sys::window().ok_or_else(|| js_err("no window object".into()))?;
    let document = window
        .document()
        .ok_or_else(|| js_err("no document".into()))?;

    let parts = js_sys::Array::new();
    parts.push(&JsValue::from_str(contents));
    let options = BlobPropertyBag::new();
    options.set_type("application/json");
    let blob = Blob::new_with_str_sequence_and_options(&parts, &options)
        .map_err(|e| js_err(format!("{:?}", e)))?;
    let url = Url::create_object_url_with_blob(&blob).map_err(|e| js_err(format!("{:?}", e)))?;

    let anchor: HtmlAnchorElement = document
        .create_element("a")
        .map_err(|e| js_err(format!("{:?}", e)))?
        .dyn_into()
        .map_err(|e| js_err(format!("{:?}", e)))?;
    anchor.set_href(&url);
    anchor.set_download(file_name);

    let body = document
        .body()
        .ok_or_else(|| js_err("no document body".into()))?;
    body.append_child(&anchor)
        .map_err(|e| js_err(format!("{:?}", e)))?;
    anchor.click();
    anchor.remove();

    let _ = Url::revoke_object_url(&url);
    Ok(())
}

fn js_err(message: String) -> AssistantError {
    AssistantError::Storage(message)
}
