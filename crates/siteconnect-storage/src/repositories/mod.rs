//! SQLite repository implementations

mod session_repository;

pub use session_repository::{SqliteNavigationSlot, SqliteSessionStore};
