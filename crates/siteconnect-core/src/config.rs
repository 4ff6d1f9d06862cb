//! Connection flow configuration
//!
//! Defaults match the production frontend; every value can be overridden
//! with a `SITECONNECT_*` environment variable (a `.env` file is honored).

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Default popup width in pixels
pub const DEFAULT_POPUP_WIDTH: u32 = 600;
/// Default popup height in pixels
pub const DEFAULT_POPUP_HEIGHT: u32 = 700;
/// Popup auto-close after this long without a matching callback
pub const DEFAULT_POPUP_TIMEOUT: Duration = Duration::from_secs(180);
/// Status poll cadence
pub const DEFAULT_STATUS_POLL_INTERVAL: Duration = Duration::from_secs(300);
/// Delay before navigating to the success return path
pub const DEFAULT_SUCCESS_REDIRECT_DELAY: Duration = Duration::from_millis(1500);
/// Loopback port for the callback page server
pub const DEFAULT_CALLBACK_PORT: u16 = 45820;

/// Environment variable names
pub mod env_keys {
    pub const API_BASE_URL: &str = "SITECONNECT_API_BASE_URL";
    pub const TRUSTED_ORIGIN: &str = "SITECONNECT_TRUSTED_ORIGIN";
    pub const POPUP_TIMEOUT_SECS: &str = "SITECONNECT_POPUP_TIMEOUT_SECS";
    pub const STATUS_POLL_SECS: &str = "SITECONNECT_STATUS_POLL_SECS";
    pub const SUCCESS_REDIRECT_PATH: &str = "SITECONNECT_SUCCESS_REDIRECT_PATH";
    pub const CALLBACK_PORT: &str = "SITECONNECT_CALLBACK_PORT";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectConfig {
    /// Backend base URL (e.g. `https://api.example.com`)
    pub api_base_url: String,
    /// Build-time trusted origin for callback messages
    pub configured_origin: Option<String>,
    pub popup_width: u32,
    pub popup_height: u32,
    pub popup_timeout: Duration,
    pub status_poll_interval: Duration,
    /// Where to navigate after a successful popup flow, if anywhere
    pub success_redirect_path: Option<String>,
    pub success_redirect_delay: Duration,
    pub callback_port: u16,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            configured_origin: None,
            popup_width: DEFAULT_POPUP_WIDTH,
            popup_height: DEFAULT_POPUP_HEIGHT,
            popup_timeout: DEFAULT_POPUP_TIMEOUT,
            status_poll_interval: DEFAULT_STATUS_POLL_INTERVAL,
            success_redirect_path: None,
            success_redirect_delay: DEFAULT_SUCCESS_REDIRECT_DELAY,
            callback_port: DEFAULT_CALLBACK_PORT,
        }
    }
}

impl ConnectConfig {
    /// Load from the process environment, reading `.env` first if present
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; absent or invalid values keep defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = non_empty(lookup(env_keys::API_BASE_URL)) {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        config.configured_origin = non_empty(lookup(env_keys::TRUSTED_ORIGIN));
        config.success_redirect_path = non_empty(lookup(env_keys::SUCCESS_REDIRECT_PATH));

        if let Some(secs) = parse_var::<u64>(&lookup, env_keys::POPUP_TIMEOUT_SECS) {
            config.popup_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, env_keys::STATUS_POLL_SECS) {
            config.status_poll_interval = Duration::from_secs(secs);
        }
        if let Some(port) = parse_var::<u16>(&lookup, env_keys::CALLBACK_PORT) {
            config.callback_port = port;
        }

        config
    }

    /// `window.open` feature string for the popup
    pub fn popup_features(&self) -> String {
        format!(
            "width={},height={},scrollbars=yes,resizable=yes",
            self.popup_width, self.popup_height
        )
    }

    /// Full URL for a backend path
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = non_empty(lookup(key))?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("[Config] Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}
