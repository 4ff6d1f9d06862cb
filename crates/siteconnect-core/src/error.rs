//! Errors surfaced to callers of the connection flow

use thiserror::Error;

use crate::PlatformId;

#[derive(Debug, Error)]
pub enum ConnectError {
    /// Backend or platform setup is missing something the flow needs
    #[error("OAuth configuration error for {platform}: {message}")]
    Configuration { platform: PlatformId, message: String },

    #[error("Unknown platform: {0}")]
    UnknownPlatform(PlatformId),

    /// A flow for this platform is still waiting for its callback
    #[error("OAuth flow already in progress for {0}")]
    FlowAlreadyPending(PlatformId),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConnectError {
    pub fn configuration(platform: &PlatformId, message: impl Into<String>) -> Self {
        Self::Configuration {
            platform: platform.clone(),
            message: message.into(),
        }
    }
}

impl From<url::ParseError> for ConnectError {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidUrl(e.to_string())
    }
}

pub type ConnectResult<T> = Result<T, ConnectError>;
