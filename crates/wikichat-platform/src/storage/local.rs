//! localStorage storage backend.
//! Persistent across page reloads; available in every browser the widget
//! targets. The synchronous Web Storage API sits behind the async port so
//! backends stay interchangeable.

use async_trait::async_trait;
use wikichat_core::ports::StoragePort;
use wikichat_types::{AssistantError, Result};

pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    /// Bind to `window.localStorage`. Fails when the window is missing or
    /// storage access is denied (private mode, sandboxed frames).
    pub fn open() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| AssistantError::Storage("no window object".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| AssistantError::Storage(format!("{:?}", e)))?
            .ok_or_else(|| AssistantError::Storage("localStorage not available".to_string()))?;
        Ok(Self { storage })
    }
}

#[async_trait(?Send)]
impl StoragePort for LocalStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .storage
            .get_item(key)
            .map_err(|e| AssistantError::Storage(format!("{:?}", e)))?;
        Ok(value.map(String::into_bytes))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        // Values are always UTF-8 JSON in this application.
        let text = String::from_utf8_lossy(value);
        self.storage
            .set_item(key, &text)
            .map_err(|e| AssistantError::Storage(format!("{:?}", e)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.storage
            .remove_item(key)
            .map_err(|e| AssistantError::Storage(format!("{:?}", e)))
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let length = self
            .storage
            .length()
            .map_err(|e| AssistantError::Storage(format!("{:?}", e)))?;
        let mut keys = Vec::new();
        for i in 0..length {
            let key = self
                .storage
                .key(i)
                .map_err(|e| AssistantError::Storage(format!("{:?}", e)))?;
            if let Some(key) = key {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }

    fn backend_name(&self) -> &str {
        "localstorage"
    }
}
