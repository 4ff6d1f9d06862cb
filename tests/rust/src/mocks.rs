//! Mock browser and backend implementations for testing
//!
//! In-memory stand-ins for the window host, popups, backend API and a
//! session store that always fails.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use siteconnect_core::{ConnectError, ConnectResult, PlatformId, RepoResult, SessionStore};
use siteconnect_flow::{AuthUrlResponse, ConnectionApi, PopupHandle, StatusResponse, WindowHost};

// ============================================================================
// MockPopup
// ============================================================================

#[derive(Default)]
pub struct MockPopup {
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl MockPopup {
    /// Simulate the user closing the window
    pub fn close_by_user(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl PopupHandle for MockPopup {
    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

// ============================================================================
// MockWindowHost
// ============================================================================

/// A popup opened through [`MockWindowHost`]
#[derive(Clone)]
pub struct OpenedPopup {
    pub url: String,
    pub name: String,
    pub features: String,
    pub handle: Arc<MockPopup>,
}

pub struct MockWindowHost {
    current_url: Mutex<String>,
    block_popups: AtomicBool,
    popups: Mutex<Vec<OpenedPopup>>,
    navigations: Mutex<Vec<String>>,
    replacements: Mutex<Vec<String>>,
}

impl MockWindowHost {
    pub fn new(current_url: impl Into<String>) -> Self {
        Self {
            current_url: Mutex::new(current_url.into()),
            block_popups: AtomicBool::new(false),
            popups: Mutex::new(Vec::new()),
            navigations: Mutex::new(Vec::new()),
            replacements: Mutex::new(Vec::new()),
        }
    }

    /// Make `open_popup` return `None`, like a popup blocker
    pub fn blocking_popups(self) -> Self {
        self.block_popups.store(true, Ordering::SeqCst);
        self
    }

    /// Simulate the browser landing on a new URL
    pub fn set_current_url(&self, url: impl Into<String>) {
        *self.current_url.lock() = url.into();
    }

    pub fn popups(&self) -> Vec<OpenedPopup> {
        self.popups.lock().clone()
    }

    pub fn last_popup(&self) -> Option<OpenedPopup> {
        self.popups.lock().last().cloned()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().clone()
    }

    pub fn replacements(&self) -> Vec<String> {
        self.replacements.lock().clone()
    }
}

impl WindowHost for MockWindowHost {
    fn open_popup(&self, url: &str, name: &str, features: &str) -> Option<Arc<dyn PopupHandle>> {
        if self.block_popups.load(Ordering::SeqCst) {
            debug!("[MockWindowHost] Blocking popup {}", name);
            return None;
        }
        let handle = Arc::new(MockPopup::default());
        self.popups.lock().push(OpenedPopup {
            url: url.to_string(),
            name: name.to_string(),
            features: features.to_string(),
            handle: handle.clone(),
        });
        Some(handle)
    }

    fn navigate(&self, url: &str) {
        debug!("[MockWindowHost] Navigating to {}", url);
        self.navigations.lock().push(url.to_string());
    }

    fn current_url(&self) -> String {
        self.current_url.lock().clone()
    }

    fn replace_url(&self, url: &str) {
        self.replacements.lock().push(url.to_string());
        *self.current_url.lock() = url.to_string();
    }
}

// ============================================================================
// MockConnectionApi
// ============================================================================

#[derive(Default)]
pub struct MockConnectionApi {
    auth_urls: Mutex<HashMap<PlatformId, AuthUrlResponse>>,
    legacy_auth_urls: Mutex<HashMap<PlatformId, AuthUrlResponse>>,
    statuses: Mutex<HashMap<PlatformId, StatusResponse>>,
    failing_status: Mutex<Vec<PlatformId>>,
    auth_url_calls: AtomicUsize,
    disconnected: Mutex<Vec<PlatformId>>,
    auth_url_delay: Mutex<Option<Duration>>,
}

impl MockConnectionApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auth_url(self, platform: &PlatformId, response: AuthUrlResponse) -> Self {
        self.auth_urls.lock().insert(platform.clone(), response);
        self
    }

    /// Make every `auth_url` call take `delay` (tokio time)
    pub fn with_auth_url_delay(self, delay: Duration) -> Self {
        *self.auth_url_delay.lock() = Some(delay);
        self
    }

    pub fn with_legacy_auth_url(self, platform: &PlatformId, response: AuthUrlResponse) -> Self {
        self.legacy_auth_urls
            .lock()
            .insert(platform.clone(), response);
        self
    }

    pub fn set_status(&self, platform: &PlatformId, status: StatusResponse) {
        self.failing_status.lock().retain(|p| p != platform);
        self.statuses.lock().insert(platform.clone(), status);
    }

    pub fn fail_status(&self, platform: &PlatformId) {
        self.failing_status.lock().push(platform.clone());
    }

    pub fn auth_url_calls(&self) -> usize {
        self.auth_url_calls.load(Ordering::SeqCst)
    }

    pub fn disconnected(&self) -> Vec<PlatformId> {
        self.disconnected.lock().clone()
    }
}

#[async_trait]
impl ConnectionApi for MockConnectionApi {
    async fn auth_url(&self, platform: &PlatformId) -> ConnectResult<AuthUrlResponse> {
        self.auth_url_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.auth_url_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.auth_urls
            .lock()
            .get(platform)
            .cloned()
            .ok_or_else(|| ConnectError::Http(format!("HTTP 404 for {}", platform)))
    }

    async fn legacy_auth_url(&self, platform: &PlatformId) -> ConnectResult<AuthUrlResponse> {
        self.legacy_auth_urls
            .lock()
            .get(platform)
            .cloned()
            .ok_or_else(|| ConnectError::Http(format!("HTTP 404 for {}", platform)))
    }

    async fn status(&self, platform: &PlatformId) -> ConnectResult<StatusResponse> {
        if self.failing_status.lock().contains(platform) {
            return Err(ConnectError::Http("HTTP 502".to_string()));
        }
        Ok(self
            .statuses
            .lock()
            .get(platform)
            .cloned()
            .unwrap_or_default())
    }

    async fn disconnect(&self, platform: &PlatformId) -> ConnectResult<()> {
        self.disconnected.lock().push(platform.clone());
        Ok(())
    }
}

// ============================================================================
// FailingSessionStore
// ============================================================================

/// Session storage that rejects every operation (private browsing, quota)
#[derive(Default)]
pub struct FailingSessionStore;

#[async_trait]
impl SessionStore for FailingSessionStore {
    async fn get(&self, _key: &str) -> RepoResult<Option<String>> {
        Err(anyhow::anyhow!("session storage unavailable"))
    }

    async fn set(&self, _key: &str, _value: &str) -> RepoResult<()> {
        Err(anyhow::anyhow!("session storage unavailable"))
    }

    async fn remove(&self, _key: &str) -> RepoResult<()> {
        Err(anyhow::anyhow!("session storage unavailable"))
    }
}
