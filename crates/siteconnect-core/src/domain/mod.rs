//! Domain entities, value objects, and events
//!
//! - Platforms (PlatformId, PlatformDescriptor, PlatformRegistry)
//! - Flow state (PendingAuthFlow, TrustedOriginSet)
//! - Connection status (ConnectedPlatform, ConnectionSnapshot)
//! - Callback messages and domain events

mod connection;
mod event;
mod message;
mod pending_flow;
mod platform;
mod trusted_origins;

pub use connection::*;
pub use event::DomainEvent;
pub use message::*;
pub use pending_flow::*;
pub use platform::*;
pub use trusted_origins::*;
