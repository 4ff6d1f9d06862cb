//! # SiteConnect Core Library
//!
//! Domain types and shared state for the platform connection handshake.
//!
//! ## Modules
//!
//! - `config` - Flow configuration (`SITECONNECT_*` environment overrides)
//! - `domain` - Platforms, pending flows, trusted origins, callback messages, events
//! - `error` - Typed errors returned by the flow API
//! - `event_bus` - Broadcast distribution of domain events
//! - `repository` - Storage traits (session store, navigation slot, flow state)
//! - `status_store` - Observable connection status store

pub mod config;
pub mod domain;
pub mod error;
pub mod event_bus;
pub mod repository;
pub mod status_store;

pub use config::ConnectConfig;
pub use domain::*;
pub use error::{ConnectError, ConnectResult};
pub use event_bus::{create_shared_event_bus, EventBus, EventReceiver, EventSender, SharedEventBus};
pub use repository::*;
pub use status_store::ConnectionStatusStore;
