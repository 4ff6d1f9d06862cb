//! Pending authorization flow
//!
//! Created when a connect action starts and owned by the tab until the
//! callback consumes it or it expires.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::PlatformId;

/// Short-lived payload correlating an authorization request with its callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAuthFlow {
    pub platform: PlatformId,
    /// Opaque correlation token echoed back by the provider
    pub state: String,
    /// PKCE code verifier (only for client-generated requests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier: Option<String>,
    /// Alternative correlation value some callback pages send instead of `state`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    pub redirect_uri: String,
    /// Backend-issued opaque payload (`oauth_data`), kept for the callback page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl PendingAuthFlow {
    pub fn new(
        platform: PlatformId,
        state: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            state: state.into(),
            verifier: None,
            nonce: None,
            redirect_uri: redirect_uri.into(),
            oauth_data: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_verifier(mut self, verifier: impl Into<String>) -> Self {
        self.verifier = Some(verifier.into());
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_oauth_data(mut self, data: serde_json::Value) -> Self {
        self.oauth_data = Some(data);
        self
    }

    /// Whether the flow is older than `ttl`
    pub fn is_expired(&self, ttl: std::time::Duration) -> bool {
        match Duration::from_std(ttl) {
            Ok(ttl) => Utc::now() - self.created_at >= ttl,
            // Out of range for chrono: effectively never expires
            Err(_) => false,
        }
    }

    /// Check the correlation values carried by a callback.
    ///
    /// Every value the callback supplies must equal ours, and at least one
    /// must be supplied. A nonce only counts when this flow has one.
    pub fn matches_correlation(&self, state: Option<&str>, nonce: Option<&str>) -> bool {
        let state_ok = state.map(|s| s == self.state);
        let nonce_ok = nonce.map(|n| self.nonce.as_deref() == Some(n));

        match (state_ok, nonce_ok) {
            (None, None) => false,
            (Some(s), None) => s,
            (None, Some(n)) => n,
            (Some(s), Some(n)) => s && n,
        }
    }

    /// First 8 characters of the state, safe to log
    pub fn state_prefix(&self) -> &str {
        state_prefix(&self.state)
    }
}

/// Truncate a state token for log output
pub fn state_prefix(state: &str) -> &str {
    match state.char_indices().nth(8) {
        Some((idx, _)) => &state[..idx],
        None => state,
    }
}
