//! Layered flow-state repository.
//!
//! One logical value, three physical locations:
//!
//! 1. `{platform}_oauth_data` - last flow for the platform
//! 2. `{platform}_oauth_data_{state}` - disambiguates stale/concurrent flows
//! 3. the platform's `window.name` segment - survives cross-origin navigation
//!
//! Writes go to every layer and swallow per-layer failures; reads take the
//! first layer that yields a matching flow. Callers never learn which layer
//! answered.

use async_trait::async_trait;
use siteconnect_core::{
    keys, state_prefix, FlowStateRepository, NavigationSlot, PendingAuthFlow, PlatformId,
    SaveReport, SessionStore,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::window_name;

pub struct LayeredFlowStateRepository {
    session: Arc<dyn SessionStore>,
    navigation: Option<Arc<dyn NavigationSlot>>,
    /// Flows older than this are treated as absent
    ttl: Option<Duration>,
}

impl LayeredFlowStateRepository {
    pub fn new(session: Arc<dyn SessionStore>) -> Self {
        Self {
            session,
            navigation: None,
            ttl: None,
        }
    }

    pub fn with_navigation_slot(mut self, slot: Arc<dyn NavigationSlot>) -> Self {
        self.navigation = Some(slot);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    async fn session_set(&self, key: &str, value: &str) -> bool {
        match self.session.set(key, value).await {
            Ok(()) => true,
            Err(e) => {
                warn!("[Storage] Session write for {} failed: {}", key, e);
                false
            }
        }
    }

    async fn session_remove(&self, key: &str) {
        if let Err(e) = self.session.remove(key).await {
            warn!("[Storage] Session remove for {} failed: {}", key, e);
        }
    }

    async fn session_flow(&self, key: &str) -> Option<PendingAuthFlow> {
        let raw = match self.session.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                debug!("[Storage] Session read for {} failed: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(flow) => Some(flow),
            Err(e) => {
                debug!("[Storage] Discarding unparsable flow at {}: {}", key, e);
                None
            }
        }
    }

    async fn navigation_value(&self) -> Option<(Arc<dyn NavigationSlot>, String)> {
        let slot = self.navigation.clone()?;
        match slot.read().await {
            Ok(value) => Some((slot, value.unwrap_or_default())),
            Err(e) => {
                debug!("[Storage] Navigation slot read failed: {}", e);
                None
            }
        }
    }

    async fn navigation_flow(&self, platform: &PlatformId) -> Option<PendingAuthFlow> {
        let (_, value) = self.navigation_value().await?;
        window_name::read_flow(&value, platform)
    }

    async fn write_navigation(&self, flow: &PendingAuthFlow) -> bool {
        let Some((slot, current)) = self.navigation_value().await else {
            return false;
        };
        let updated = match window_name::upsert(&current, flow) {
            Ok(updated) => updated,
            Err(e) => {
                warn!("[Storage] Failed to encode navigation payload: {}", e);
                return false;
            }
        };
        match slot.write(&updated).await {
            Ok(()) => true,
            Err(e) => {
                warn!("[Storage] Navigation slot write failed: {}", e);
                false
            }
        }
    }

    async fn clear_navigation(&self, platform: &PlatformId, state: Option<&str>) {
        let Some((slot, current)) = self.navigation_value().await else {
            return;
        };
        let matches = match (window_name::read_flow(&current, platform), state) {
            (Some(flow), Some(state)) => flow.state == state,
            (Some(_), None) => true,
            // Unparsable or absent: drop the segment anyway
            (None, _) => current.contains(&format!("{}::", platform.window_name_tag())),
        };
        if !matches {
            return;
        }
        if let Err(e) = slot.write(&window_name::remove(&current, platform)).await {
            warn!("[Storage] Navigation slot clear failed: {}", e);
        }
    }

    fn live(&self, flow: PendingAuthFlow) -> Option<PendingAuthFlow> {
        match self.ttl {
            Some(ttl) if flow.is_expired(ttl) => {
                debug!(
                    "[Storage] Ignoring expired flow for {} (state={})",
                    flow.platform,
                    flow.state_prefix()
                );
                None
            }
            _ => Some(flow),
        }
    }
}

#[async_trait]
impl FlowStateRepository for LayeredFlowStateRepository {
    async fn save(&self, flow: &PendingAuthFlow) -> SaveReport {
        let json = match serde_json::to_string(flow) {
            Ok(json) => json,
            Err(e) => {
                warn!("[Storage] Failed to serialize pending flow: {}", e);
                return SaveReport::default();
            }
        };

        let report = SaveReport {
            latest: self.session_set(&keys::flow_data(&flow.platform), &json).await,
            by_state: self
                .session_set(&keys::flow_data_for_state(&flow.platform, &flow.state), &json)
                .await,
            navigation: self.write_navigation(flow).await,
        };

        debug!(
            "[Storage] Saved flow for {} (state={}) latest={} by_state={} navigation={}",
            flow.platform,
            flow.state_prefix(),
            report.latest,
            report.by_state,
            report.navigation
        );
        report
    }

    async fn load_by_state(
        &self,
        platform: &PlatformId,
        state: &str,
    ) -> Option<PendingAuthFlow> {
        let found = match self
            .session_flow(&keys::flow_data_for_state(platform, state))
            .await
        {
            Some(flow) if flow.state == state => Some(flow),
            _ => None,
        };

        let found = match found {
            Some(flow) => Some(flow),
            None => self
                .session_flow(&keys::flow_data(platform))
                .await
                .filter(|flow| flow.state == state),
        };

        let found = match found {
            Some(flow) => Some(flow),
            None => self
                .navigation_flow(platform)
                .await
                .filter(|flow| flow.state == state),
        };

        if found.is_none() {
            debug!(
                "[Storage] No stored flow for {} (state={})",
                platform,
                state_prefix(state)
            );
        }
        found
            .filter(|flow| flow.platform == *platform)
            .and_then(|flow| self.live(flow))
    }

    async fn load_latest(&self, platform: &PlatformId) -> Option<PendingAuthFlow> {
        let found = match self.session_flow(&keys::flow_data(platform)).await {
            Some(flow) => Some(flow),
            None => self.navigation_flow(platform).await,
        };
        found
            .filter(|flow| flow.platform == *platform)
            .and_then(|flow| self.live(flow))
    }

    async fn clear(&self, platform: &PlatformId, state: Option<&str>) {
        let latest_key = keys::flow_data(platform);
        let latest = self.session_flow(&latest_key).await;

        match state {
            Some(state) => {
                self.session_remove(&keys::flow_data_for_state(platform, state))
                    .await;
                if latest.as_ref().map_or(true, |flow| flow.state == state) {
                    self.session_remove(&latest_key).await;
                }
            }
            None => {
                if let Some(flow) = &latest {
                    self.session_remove(&keys::flow_data_for_state(platform, &flow.state))
                        .await;
                }
                self.session_remove(&latest_key).await;
            }
        }

        self.clear_navigation(platform, state).await;
    }

    async fn remember_return_to(&self, platform: &PlatformId, url: &str) -> bool {
        let key = keys::return_to(platform);
        match self.session.get(&key).await {
            Ok(Some(existing)) if !existing.is_empty() => {
                debug!(
                    "[Storage] Return-to for {} already set to {}, keeping it",
                    platform, existing
                );
                false
            }
            _ => self.session_set(&key, url).await,
        }
    }

    async fn take_return_to(&self, platform: &PlatformId) -> Option<String> {
        let key = keys::return_to(platform);
        let value = self.session.get(&key).await.ok().flatten();
        if value.is_some() {
            self.session_remove(&key).await;
        }
        value.filter(|v| !v.is_empty())
    }

    async fn save_client_id(&self, platform: &PlatformId, client_id: &str) {
        self.session_set(&keys::client_id(platform), client_id).await;
    }

    async fn load_client_id(&self, platform: &PlatformId) -> Option<String> {
        self.session
            .get(&keys::client_id(platform))
            .await
            .ok()
            .flatten()
    }
}
