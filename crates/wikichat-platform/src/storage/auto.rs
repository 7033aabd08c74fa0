//! Pick the best available storage backend.
//!
//! Priority: localStorage → Memory (fallback).

use std::rc::Rc;

use wikichat_core::ports::StoragePort;

use super::{LocalStorage, MemoryStorage};

/// Open the best available storage backend.
/// Returns a trait object so callers are backend-agnostic.
pub fn detect_storage() -> Rc<dyn StoragePort> {
    match LocalStorage::open() {
        Ok(local) => {
            log::info!("Storage backend: localStorage");
            Rc::new(local)
        }
        Err(e) => {
            log::warn!("localStorage unavailable ({}), falling back to memory", e);
            Rc::new(MemoryStorage::new())
        }
    }
}
