//! Cross-window callback messages
//!
//! Wire shape posted by the callback page to its opener:
//! `{ "type": "WIX_OAUTH_SUCCESS", "state": "...", "nonce": "...", "error": "..." }`

use serde::{Deserialize, Serialize};

/// A `message` event as delivered to the opener window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowMessage {
    /// Sender origin as reported by the browser (`event.origin`)
    pub origin: String,
    /// Structured-clone payload (`event.data`)
    pub data: serde_json::Value,
}

impl WindowMessage {
    pub fn new(origin: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            origin: origin.into(),
            data,
        }
    }
}

/// Typed view of a callback payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl OAuthMessage {
    /// Parse `event.data`; `None` unless it is a JSON object with a string `type`
    pub fn from_data(data: &serde_json::Value) -> Option<Self> {
        if !data.is_object() {
            return None;
        }
        serde_json::from_value(data.clone()).ok()
    }

    /// Human-readable failure description for error messages
    pub fn error_message(&self) -> String {
        match (&self.error, &self.error_description) {
            (Some(e), Some(desc)) => format!("{}: {}", e, desc),
            (Some(e), None) => e.clone(),
            (None, Some(desc)) => desc.clone(),
            (None, None) => "Authorization was not completed".to_string(),
        }
    }
}
