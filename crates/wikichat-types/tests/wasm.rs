//! WASM-target tests for wikichat-types.
//!
//! Mirrors the native unit tests but runs under wasm32-unknown-unknown
//! via `wasm-pack test --node`.

use wasm_bindgen_test::*;

use wikichat_types::config::*;
use wikichat_types::message::*;
use wikichat_types::provider::*;
use wikichat_types::session::*;

// ─── Message Tests ───────────────────────────────────────

#[wasm_bindgen_test]
fn message_user() {
    let msg = Message::user("Hello");
    assert_eq!(msg.role, Role::User);
    assert_eq!(msg.content, "Hello");
    assert_eq!(msg.swipes.len(), 1);
}

#[wasm_bindgen_test]
fn append_swipe_selects_new_variant() {
    let mut msg = Message::assistant("A");
    msg.append_swipe("B");
    assert_eq!(msg.swipe_index, 1);
    assert_eq!(msg.content, "B");
}

#[wasm_bindgen_test]
fn select_swipe_syncs_content() {
    let mut msg = Message::assistant("A");
    msg.append_swipe("B");
    assert!(msg.select_swipe(0));
    assert_eq!(msg.content, "A");
}

#[wasm_bindgen_test]
fn legacy_bot_role_deserializes_as_assistant() {
    let json = r#"{"role":"bot","content":"hi","swipes":["hi"],"swipeIndex":0,"timestamp":1}"#;
    let msg: Message = serde_json::from_str(json).unwrap();
    assert_eq!(msg.role, Role::Assistant);
}

// ─── Session Tests ───────────────────────────────────────

#[wasm_bindgen_test]
fn session_new_has_uuid() {
    let session = Session::new(DEFAULT_TITLE);
    assert!(!session.id.is_empty());
    assert!(session.last_updated > 0);
}

#[wasm_bindgen_test]
fn derive_title_truncates() {
    let long = "a".repeat(25);
    assert_eq!(derive_title(&long), format!("{}...", "a".repeat(20)));
}

#[wasm_bindgen_test]
fn collection_schema_field_names() {
    let collection = SessionCollection {
        sessions: vec![Session::new(DEFAULT_TITLE)],
        active_session_id: Some("abc".to_string()),
    };
    let json = serde_json::to_string(&collection).unwrap();
    assert!(json.contains("\"activeSessionId\""));
}

// ─── Provider Tests ──────────────────────────────────────

#[wasm_bindgen_test]
fn provider_catalogue_nonempty() {
    assert!(!ProviderKey::Google.known_models().is_empty());
}

#[wasm_bindgen_test]
fn generation_config_default() {
    let config = GenerationConfig::default();
    assert_eq!(config.provider, ProviderKey::OpenAi);
    assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
}
