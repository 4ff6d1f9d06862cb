//! SiteConnect Storage Layer
//!
//! Backends for the tab-scoped session store and the navigation slot, plus
//! the layered repository that keeps a pending flow alive across the
//! authorization round-trip.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              FlowStateRepository                     │
//! │          (LayeredFlowStateRepository)                │
//! ├──────────────────────────┬───────────────────────────┤
//! │      SessionStore        │      NavigationSlot       │
//! │  (Memory / SQLite)       │  (Memory / SQLite)        │
//! ├──────────────────────────┼───────────────────────────┤
//! │ SessionCipher (AES-GCM)  │  window_name codec        │
//! ├──────────────────────────┴───────────────────────────┤
//! │                   Database (SQLite)                  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use siteconnect_storage::{
//!     Database, LayeredFlowStateRepository, SessionCipher, SqliteNavigationSlot,
//!     SqliteSessionStore,
//! };
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//!
//! let db = Arc::new(Mutex::new(Database::open(&path)?));
//! let cipher = Arc::new(SessionCipher::new(&key)?);
//!
//! let session = Arc::new(SqliteSessionStore::new(db.clone()).with_cipher(cipher));
//! let slot = Arc::new(SqliteNavigationSlot::new(db, "main"));
//! let flows = LayeredFlowStateRepository::new(session).with_navigation_slot(slot);
//! ```

pub mod crypto;
mod database;
mod flow_state;
mod memory;
mod repositories;
pub mod window_name;

pub use crypto::{generate_session_key, SessionCipher, KEY_SIZE};
pub use database::Database;
pub use flow_state::LayeredFlowStateRepository;
pub use memory::{MemoryNavigationSlot, MemorySessionStore};
pub use repositories::*;

/// Default database file name.
pub const DATABASE_FILE: &str = "siteconnect.db";

/// Get the default database path for the current platform.
pub fn default_database_path() -> Option<std::path::PathBuf> {
    dirs::data_local_dir().map(|p| p.join("siteconnect").join(DATABASE_FILE))
}
