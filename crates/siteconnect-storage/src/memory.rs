//! In-memory storage backends.
//!
//! Used by hosts that mirror the browser's storage themselves and by tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use siteconnect_core::{NavigationSlot, RepoResult, SessionStore};
use std::collections::HashMap;

#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> RepoResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> RepoResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// `window.name` stand-in
#[derive(Default)]
pub struct MemoryNavigationSlot {
    value: Mutex<Option<String>>,
}

impl MemoryNavigationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
        }
    }

    pub fn get(&self) -> Option<String> {
        self.value.lock().clone()
    }
}

#[async_trait]
impl NavigationSlot for MemoryNavigationSlot {
    async fn read(&self) -> RepoResult<Option<String>> {
        Ok(self.value.lock().clone())
    }

    async fn write(&self, value: &str) -> RepoResult<()> {
        *self.value.lock() = if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        };
        Ok(())
    }
}
