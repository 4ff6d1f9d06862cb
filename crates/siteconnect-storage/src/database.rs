//! SQLite database for native hosts.
//!
//! Desktop webview shells have no browser `sessionStorage`; they keep
//! session entries and the navigation slot here instead.
//!
//! ## Migration System
//!
//! Migrations are numbered sequentially and stored in `migrations/`. Each
//! runs exactly once, tracked via the `schema_migrations` table.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info};

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial",
    sql: include_str!("migrations/001_initial.sql"),
}];

/// SQLite database wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at `path` and apply pending migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        debug!("[Storage] Opened database at {:?}", path);

        let db = Self { conn };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        debug!("[Storage] Opened in-memory database");

        let db = Self { conn };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current_version = self.schema_version();

        for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
            info!(
                "[Storage] Running migration {} ({})",
                migration.version, migration.name
            );

            let tx = self.conn.unchecked_transaction()?;
            self.conn.execute_batch(migration.sql).with_context(|| {
                format!(
                    "Failed to run migration {} ({})",
                    migration.version, migration.name
                )
            })?;
            self.conn.execute(
                "INSERT OR REPLACE INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, datetime('now'))",
                rusqlite::params![migration.version, migration.name],
            )?;
            tx.commit()?;
        }

        Ok(())
    }

    /// Highest applied migration version (0 when none).
    pub fn schema_version(&self) -> i64 {
        self.conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
