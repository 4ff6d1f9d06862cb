//! Backend response shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use siteconnect_core::{ConnectedPlatform, ConnectedSite, PlatformId};

/// `GET /api/oauth/{provider}/auth-url` and `GET /{provider}/auth/url`.
///
/// Every field is optional on the wire; missing pieces are reported as
/// configuration errors when the payload is resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthUrlResponse {
    #[serde(default, alias = "url", alias = "authorization_url")]
    pub auth_url: Option<String>,
    #[serde(default)]
    pub oauth_data: Option<serde_json::Value>,
    #[serde(default)]
    pub trusted_origins: Vec<String>,
    #[serde(default)]
    pub client_id: Option<String>,
}

/// `GET /api/oauth/{provider}/status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub sites: Vec<ConnectedSite>,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
}

impl StatusResponse {
    pub fn into_detail(self, platform: PlatformId) -> ConnectedPlatform {
        ConnectedPlatform {
            platform_id: platform,
            connected: self.connected,
            sites: self.sites,
            last_sync: self.last_sync.or_else(|| Some(Utc::now())),
        }
    }
}
