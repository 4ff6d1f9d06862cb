//! Repository traits for flow-state storage
//!
//! These traits describe the browser-local storage the handshake relies on
//! without tying it to a backend (web session storage, SQLite, in-memory).

use async_trait::async_trait;

use crate::domain::{PendingAuthFlow, PlatformId};

/// Result type for repository operations
pub type RepoResult<T> = anyhow::Result<T>;

/// Session-storage key conventions.
///
/// Keys are namespaced by the platform id so flows for different platforms
/// never share a slot.
pub mod keys {
    use crate::domain::PlatformId;

    /// Last-flow convenience slot: `{provider}_oauth_data`
    pub fn flow_data(platform: &PlatformId) -> String {
        format!("{}_oauth_data", platform)
    }

    /// State-keyed slot: `{provider}_oauth_data_{state}`
    pub fn flow_data_for_state(platform: &PlatformId, state: &str) -> String {
        format!("{}_oauth_data_{}", platform, state)
    }

    /// Return-to location: `{provider}_oauth_redirect`
    pub fn return_to(platform: &PlatformId) -> String {
        format!("{}_oauth_redirect", platform)
    }

    /// Backend-issued client id: `{provider}_oauth_client_id`
    pub fn client_id(platform: &PlatformId) -> String {
        format!("{}_oauth_client_id", platform)
    }
}

/// Tab-scoped key-value storage (the `sessionStorage` role)
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> RepoResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> RepoResult<()>;

    async fn remove(&self, key: &str) -> RepoResult<()>;
}

/// A single string that survives a top-level cross-origin navigation
/// (the `window.name` role)
#[async_trait]
pub trait NavigationSlot: Send + Sync {
    async fn read(&self) -> RepoResult<Option<String>>;

    async fn write(&self, value: &str) -> RepoResult<()>;
}

/// Which persistence layers accepted a write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub latest: bool,
    pub by_state: bool,
    pub navigation: bool,
}

impl SaveReport {
    pub fn any(&self) -> bool {
        self.latest || self.by_state || self.navigation
    }
}

/// Pending-flow persistence across navigations.
///
/// Implementations never fail outward: unavailable storage degrades to
/// whichever layers still work.
#[async_trait]
pub trait FlowStateRepository: Send + Sync {
    /// Persist the flow to every available layer
    async fn save(&self, flow: &PendingAuthFlow) -> SaveReport;

    /// Find the flow whose state equals `state`
    async fn load_by_state(&self, platform: &PlatformId, state: &str)
        -> Option<PendingAuthFlow>;

    /// Most recently saved flow for the platform
    async fn load_latest(&self, platform: &PlatformId) -> Option<PendingAuthFlow>;

    /// Remove the flow from every layer (all flows for the platform when
    /// `state` is `None`)
    async fn clear(&self, platform: &PlatformId, state: Option<&str>);

    /// Record where to return after authorization. First write wins;
    /// returns `true` if this call stored the value.
    async fn remember_return_to(&self, platform: &PlatformId, url: &str) -> bool;

    /// Read and forget the return-to location
    async fn take_return_to(&self, platform: &PlatformId) -> Option<String>;

    async fn save_client_id(&self, platform: &PlatformId, client_id: &str);

    async fn load_client_id(&self, platform: &PlatformId) -> Option<String>;
}
