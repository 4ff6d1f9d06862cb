//! SiteConnect Flow
//!
//! Popup/redirect OAuth connection flow for third-party website platforms:
//! - Authorization payloads from the backend or a local PKCE factory
//! - Popup launch with full-page redirect fallback
//! - Callback message validation (origin, type, state/nonce)
//! - Redirect-return handling (`?{platform}_connected=true`, `?error=`)
//! - Loopback callback page for client-generated flows
//! - Connection status polling

pub mod api;
pub mod host;
pub mod listener;
pub mod logging;
pub mod oauth;
pub mod server;
pub mod service;
pub mod status;

pub use api::{AuthUrlResponse, BackendApiClient, ConnectionApi, StatusResponse};
pub use host::{MessageBus, MessageListener, PopupHandle, WindowHost};
pub use listener::{ListenerOutcome, RedirectOutcome};
pub use oauth::{AuthorizationPayload, ClientAuthFactory, PkceChallenge};
pub use server::{
    callback_router, start_callback_server, CallbackServerHandle, CallbackServerState,
};
pub use service::{ConnectionService, LaunchOutcome};
pub use status::StatusPoller;
