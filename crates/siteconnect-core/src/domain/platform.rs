//! Platform descriptors
//!
//! Every connectable platform (Wix, Search Console, Bing, WordPress) is
//! described by a [`PlatformDescriptor`]: how its authorization payload is
//! obtained, whether it launches in a popup or a full-page redirect, and
//! which message discriminators its callback page emits.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Platform identifier (lowercase, e.g. `wix`, `gsc`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformId(String);

impl PlatformId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Tag used for the platform's `window.name` segment (e.g. `WIX_OAUTH`)
    pub fn window_name_tag(&self) -> String {
        format!("{}_OAUTH", self.0.to_ascii_uppercase())
    }

    /// Query parameter set by the server-side redirect after a successful
    /// connection (e.g. `wix_connected`)
    pub fn connected_query_param(&self) -> String {
        format!("{}_connected", self.0)
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlatformId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// How the authorization page is presented to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchMode {
    /// Secondary window that reports back via `postMessage`
    Popup,
    /// Navigate the current tab away and back
    Redirect,
}

/// Where the authorization payload comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PayloadSource {
    /// `GET /api/oauth/{provider}/auth-url`
    Backend,
    /// `GET /{provider}/auth/url`
    LegacyBackend,
    /// Generated locally (PKCE + state) against the provider's authorize endpoint
    ClientFactory {
        authorize_endpoint: String,
        client_id: Option<String>,
        #[serde(default)]
        scopes: Vec<String>,
    },
}

/// Classification of a callback message `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
}

/// Static description of a connectable platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformDescriptor {
    pub id: PlatformId,
    pub display_name: String,
    pub launch_mode: LaunchMode,
    pub payload_source: PayloadSource,
    /// Message `type` announcing success (e.g. `WIX_OAUTH_SUCCESS`)
    pub success_type: String,
    /// Message `type` announcing failure (e.g. `WIX_OAUTH_ERROR`)
    pub error_type: String,
}

impl PlatformDescriptor {
    /// Descriptor using the conventional `{PLATFORM}_OAUTH_*` discriminators
    pub fn new(
        id: impl AsRef<str>,
        display_name: impl Into<String>,
        launch_mode: LaunchMode,
        payload_source: PayloadSource,
    ) -> Self {
        let id = PlatformId::new(id);
        let tag = id.window_name_tag();
        Self {
            success_type: format!("{}_SUCCESS", tag),
            error_type: format!("{}_ERROR", tag),
            id,
            display_name: display_name.into(),
            launch_mode,
            payload_source,
        }
    }

    /// Override the message discriminators
    pub fn with_message_types(
        mut self,
        success_type: impl Into<String>,
        error_type: impl Into<String>,
    ) -> Self {
        self.success_type = success_type.into();
        self.error_type = error_type.into();
        self
    }

    /// Map a message `type` to success/error, `None` when it is not ours
    pub fn classify(&self, message_type: &str) -> Option<MessageKind> {
        if message_type == self.success_type {
            Some(MessageKind::Success)
        } else if message_type == self.error_type {
            Some(MessageKind::Error)
        } else {
            None
        }
    }

    pub fn wix() -> Self {
        Self::new("wix", "Wix", LaunchMode::Popup, PayloadSource::Backend)
    }

    pub fn google_search_console() -> Self {
        Self::new(
            "gsc",
            "Google Search Console",
            LaunchMode::Popup,
            PayloadSource::LegacyBackend,
        )
        .with_message_types("GSC_AUTH_SUCCESS", "GSC_AUTH_ERROR")
    }

    pub fn bing() -> Self {
        Self::new(
            "bing",
            "Bing Webmaster Tools",
            LaunchMode::Popup,
            PayloadSource::Backend,
        )
    }

    pub fn wordpress() -> Self {
        Self::new(
            "wordpress",
            "WordPress.com",
            LaunchMode::Redirect,
            PayloadSource::ClientFactory {
                authorize_endpoint: "https://public-api.wordpress.com/oauth2/authorize"
                    .to_string(),
                client_id: None,
                scopes: vec!["global".to_string()],
            },
        )
    }
}

/// Lookup table of known platforms
#[derive(Debug, Clone, Default)]
pub struct PlatformRegistry {
    platforms: HashMap<PlatformId, PlatformDescriptor>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with Wix, Search Console, Bing and WordPress
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(PlatformDescriptor::wix());
        registry.register(PlatformDescriptor::google_search_console());
        registry.register(PlatformDescriptor::bing());
        registry.register(PlatformDescriptor::wordpress());
        registry
    }

    /// Add or replace a descriptor
    pub fn register(&mut self, descriptor: PlatformDescriptor) {
        self.platforms.insert(descriptor.id.clone(), descriptor);
    }

    pub fn get(&self, id: &PlatformId) -> Option<&PlatformDescriptor> {
        self.platforms.get(id)
    }

    pub fn ids(&self) -> Vec<PlatformId> {
        let mut ids: Vec<_> = self.platforms.keys().cloned().collect();
        ids.sort();
        ids
    }
}
