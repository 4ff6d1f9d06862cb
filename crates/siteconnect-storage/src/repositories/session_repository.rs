//! SQLite implementations of SessionStore and NavigationSlot.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::params;
use siteconnect_core::{NavigationSlot, SessionStore};
use tokio::sync::Mutex;
use tracing::warn;

use crate::crypto::SessionCipher;
use crate::Database;

/// SQLite-backed session store.
///
/// With a cipher attached, values are sealed on write; rows written before
/// the cipher was attached are still readable as plaintext.
pub struct SqliteSessionStore {
    db: Arc<Mutex<Database>>,
    cipher: Option<Arc<SessionCipher>>,
}

impl SqliteSessionStore {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db, cipher: None }
    }

    pub fn with_cipher(mut self, cipher: Arc<SessionCipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// Drop every entry (end of the host "session")
    pub async fn clear_all(&self) -> Result<usize> {
        let db = self.db.lock().await;
        Ok(db.connection().execute("DELETE FROM session_entries", [])?)
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().await;
        let result = db.connection().query_row(
            "SELECT value, encrypted FROM session_entries WHERE key = ?",
            params![key],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?)),
        );

        let (value, encrypted) = match result {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if !encrypted {
            return Ok(Some(value));
        }
        match &self.cipher {
            Some(cipher) => cipher.open(key, &value).map(Some),
            None => {
                warn!("[Storage] Entry {} is encrypted but no cipher is configured", key);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let (stored, encrypted) = match &self.cipher {
            Some(cipher) => (cipher.seal(key, value)?, true),
            None => (value.to_string(), false),
        };

        let db = self.db.lock().await;
        db.connection().execute(
            "INSERT INTO session_entries (key, value, encrypted, updated_at)
             VALUES (?, ?, ?, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, encrypted = excluded.encrypted, updated_at = excluded.updated_at",
            params![key, stored, encrypted],
        )?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute("DELETE FROM session_entries WHERE key = ?", params![key])?;
        Ok(())
    }
}

/// SQLite-backed navigation slot, one row per host window.
pub struct SqliteNavigationSlot {
    db: Arc<Mutex<Database>>,
    window_id: String,
}

impl SqliteNavigationSlot {
    pub fn new(db: Arc<Mutex<Database>>, window_id: impl Into<String>) -> Self {
        Self {
            db,
            window_id: window_id.into(),
        }
    }
}

#[async_trait]
impl NavigationSlot for SqliteNavigationSlot {
    async fn read(&self) -> Result<Option<String>> {
        let db = self.db.lock().await;
        let result = db.connection().query_row(
            "SELECT value FROM navigation_slots WHERE window_id = ?",
            params![self.window_id],
            |row| row.get(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, value: &str) -> Result<()> {
        let db = self.db.lock().await;
        if value.is_empty() {
            db.connection().execute(
                "DELETE FROM navigation_slots WHERE window_id = ?",
                params![self.window_id],
            )?;
        } else {
            db.connection().execute(
                "INSERT INTO navigation_slots (window_id, value, updated_at)
                 VALUES (?, ?, datetime('now'))
                 ON CONFLICT(window_id) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![self.window_id, value],
            )?;
        }
        Ok(())
    }
}
