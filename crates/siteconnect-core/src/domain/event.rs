//! Domain events
//!
//! Everything observable that happens during a connection handshake is
//! published as a [`DomainEvent`]. UI shells turn `FlowFailed` into a toast,
//! status widgets react to `ConnectionAdded`/`ConnectionRemoved`.

use serde::{Deserialize, Serialize};

use super::{LaunchMode, PlatformId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// Authorization launched
    FlowStarted {
        platform: PlatformId,
        launch_mode: LaunchMode,
    },
    /// `window.open` returned nothing; fell back to a full-page redirect
    PopupBlocked { platform: PlatformId },
    /// Provider reported failure (`*_ERROR` message or `?error=` param)
    FlowFailed { platform: PlatformId, error: String },
    /// No matching callback before the popup timeout
    FlowTimedOut { platform: PlatformId },
    /// Pending flow dropped by an explicit cancel
    FlowCancelled { platform: PlatformId },
    /// Navigation to the configured return path is scheduled
    SuccessRedirectScheduled { platform: PlatformId, path: String },

    ConnectionAdded { platform: PlatformId },
    ConnectionRemoved { platform: PlatformId },
    /// Status poll refreshed the per-platform detail
    ConnectionDetailUpdated { platform: PlatformId, connected: bool },
}

impl DomainEvent {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::FlowStarted { .. } => "flow_started",
            Self::PopupBlocked { .. } => "popup_blocked",
            Self::FlowFailed { .. } => "flow_failed",
            Self::FlowTimedOut { .. } => "flow_timed_out",
            Self::FlowCancelled { .. } => "flow_cancelled",
            Self::SuccessRedirectScheduled { .. } => "success_redirect_scheduled",
            Self::ConnectionAdded { .. } => "connection_added",
            Self::ConnectionRemoved { .. } => "connection_removed",
            Self::ConnectionDetailUpdated { .. } => "connection_detail_updated",
        }
    }

    pub fn platform(&self) -> &PlatformId {
        match self {
            Self::FlowStarted { platform, .. }
            | Self::PopupBlocked { platform }
            | Self::FlowFailed { platform, .. }
            | Self::FlowTimedOut { platform }
            | Self::FlowCancelled { platform }
            | Self::SuccessRedirectScheduled { platform, .. }
            | Self::ConnectionAdded { platform }
            | Self::ConnectionRemoved { platform }
            | Self::ConnectionDetailUpdated { platform, .. } => platform,
        }
    }

    /// Whether the event should be surfaced to the user as a failure
    pub fn is_user_facing_error(&self) -> bool {
        matches!(self, Self::FlowFailed { .. } | Self::FlowTimedOut { .. })
    }
}
