//! Authorization request construction
//!
//! - `pkce` - PKCE pair and state generation
//! - `client_factory` - client-side authorize URL builder
//! - `payload` - normalized authorization payload
//! - `pending` - one-pending-flow-per-platform registry

pub mod client_factory;
pub mod payload;
pub mod pending;
pub mod pkce;

pub use client_factory::{ClientAuthFactory, ClientAuthRequest};
pub use payload::AuthorizationPayload;
pub use pending::{PendingFlows, Reservation};
pub use pkce::{generate_state, PkceChallenge};
