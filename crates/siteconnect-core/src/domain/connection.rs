//! Connection status entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::PlatformId;

/// A site exposed by a connected platform account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedSite {
    pub url: String,
    #[serde(default)]
    pub name: String,
}

/// Per-platform connection detail, refreshed by status polls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedPlatform {
    pub platform_id: PlatformId,
    pub connected: bool,
    #[serde(default)]
    pub sites: Vec<ConnectedSite>,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
}

impl ConnectedPlatform {
    pub fn connected(platform_id: PlatformId, sites: Vec<ConnectedSite>) -> Self {
        Self {
            platform_id,
            connected: true,
            sites,
            last_sync: Some(Utc::now()),
        }
    }

    pub fn disconnected(platform_id: PlatformId) -> Self {
        Self {
            platform_id,
            connected: false,
            sites: Vec::new(),
            last_sync: Some(Utc::now()),
        }
    }
}

/// Immutable view of the connection status store.
///
/// A new snapshot is published for every change; `version` increases by one
/// each time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionSnapshot {
    pub version: u64,
    pub connected: BTreeSet<PlatformId>,
    pub details: BTreeMap<PlatformId, ConnectedPlatform>,
}

impl ConnectionSnapshot {
    pub fn is_connected(&self, platform: &PlatformId) -> bool {
        self.connected.contains(platform)
    }

    pub fn connected_platforms(&self) -> Vec<PlatformId> {
        self.connected.iter().cloned().collect()
    }

    pub fn detail(&self, platform: &PlatformId) -> Option<&ConnectedPlatform> {
        self.details.get(platform)
    }
}
