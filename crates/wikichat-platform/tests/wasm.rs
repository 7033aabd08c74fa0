//! WASM-target tests for wikichat-platform.
//!
//! Runs under wasm32-unknown-unknown via `wasm-pack test --node`; the
//! memory backend is exercised directly, localStorage only where the
//! environment provides it.

use wasm_bindgen_test::*;

use wikichat_core::ports::StoragePort;
use wikichat_platform::storage::MemoryStorage;

#[wasm_bindgen_test]
async fn memory_storage_set_and_get() {
    let storage = MemoryStorage::new();
    storage.set("k", b"value").await.unwrap();
    assert_eq!(storage.get("k").await.unwrap(), Some(b"value".to_vec()));
}

#[wasm_bindgen_test]
async fn memory_storage_get_missing() {
    let storage = MemoryStorage::new();
    assert_eq!(storage.get("nope").await.unwrap(), None);
    assert!(!storage.exists("nope").await.unwrap());
}

#[wasm_bindgen_test]
async fn memory_storage_delete() {
    let storage = MemoryStorage::new();
    storage.set("k", b"v").await.unwrap();
    storage.delete("k").await.unwrap();
    assert_eq!(storage.get("k").await.unwrap(), None);
}

#[wasm_bindgen_test]
async fn memory_storage_list_keys_by_prefix() {
    let storage = MemoryStorage::new();
    storage.set("wikichat:a", b"1").await.unwrap();
    storage.set("wikichat:b", b"2").await.unwrap();
    storage.set("other", b"3").await.unwrap();
    let mut keys = storage.list_keys("wikichat:").await.unwrap();
    keys.sort();
    assert_eq!(keys, vec!["wikichat:a".to_string(), "wikichat:b".to_string()]);
}

#[wasm_bindgen_test]
fn backend_name_is_stable() {
    assert_eq!(MemoryStorage::new().backend_name(), "memory");
}
