//! Persistence: schema migration and the `Db` connection wrapper every
//! repository (registry, store, cell, rotation, audit) is built on.

use rusqlite::Connection;
use std::path::Path;

use crate::error::VaultResult;

/// Thin wrapper around a `rusqlite::Connection` that owns schema migration
/// and the pragmas the rest of the crate relies on (`foreign_keys = ON`,
/// WAL journaling for concurrent readers).
pub struct Db {
    conn: Connection,
}

impl Db {
    /// Opens (creating if absent) the SQLite database at `path` and runs
    /// migrations.
    pub fn open(path: impl AsRef<Path>) -> VaultResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.configure()?;
        db.migrate()?;
        Ok(db)
    }

    /// Opens an in-memory database. Used by tests and by any deployment
    /// that doesn't need persistence across restarts.
    pub fn open_in_memory() -> VaultResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.configure()?;
        db.migrate()?;
        Ok(db)
    }

    fn configure(&self) -> VaultResult<()> {
        self.conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Creates the seven tables this system is built on, if they don't
    /// already exist. Cascades are expressed as real foreign keys so a
    /// cell delete removes its secrets, versions, keys, permissions, and
    /// rotation schedule without application code iterating children.
    fn migrate(&self) -> VaultResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cells (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                rotation_period INTEGER NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}'
            );

            CREATE TABLE IF NOT EXISTS secrets (
                id TEXT PRIMARY KEY,
                cell_id TEXT NOT NULL REFERENCES cells(id) ON DELETE CASCADE,
                key TEXT NOT NULL,
                ciphertext TEXT NOT NULL,
                version INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                UNIQUE(cell_id, key)
            );

            CREATE TABLE IF NOT EXISTS secret_versions (
                id TEXT PRIMARY KEY,
                secret_id TEXT NOT NULL REFERENCES secrets(id) ON DELETE CASCADE,
                ciphertext TEXT NOT NULL,
                version INTEGER NOT NULL,
                cell_key_version INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE(secret_id, version)
            );

            CREATE TABLE IF NOT EXISTS cell_keys (
                id TEXT PRIMARY KEY,
                cell_id TEXT NOT NULL REFERENCES cells(id) ON DELETE CASCADE,
                version INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                active INTEGER NOT NULL,
                wrapped_key TEXT NOT NULL,
                UNIQUE(cell_id, version)
            );

            CREATE TABLE IF NOT EXISTS cell_permissions (
                id TEXT PRIMARY KEY,
                cell_id TEXT NOT NULL REFERENCES cells(id) ON DELETE CASCADE,
                user_id TEXT NOT NULL,
                permission TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER,
                UNIQUE(cell_id, user_id)
            );

            CREATE TABLE IF NOT EXISTS rotation_schedules (
                id TEXT PRIMARY KEY,
                cell_id TEXT NOT NULL REFERENCES cells(id) ON DELETE CASCADE,
                interval_days INTEGER NOT NULL,
                last_rotation INTEGER NOT NULL,
                next_rotation INTEGER NOT NULL,
                is_active INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_rotation_schedules_next_rotation
                ON rotation_schedules(next_rotation);

            CREATE TABLE IF NOT EXISTS audit_logs (
                id TEXT PRIMARY KEY,
                timestamp INTEGER NOT NULL,
                user_id TEXT,
                action TEXT NOT NULL,
                resource_type TEXT NOT NULL,
                resource_id TEXT,
                cell_id TEXT REFERENCES cells(id) ON DELETE SET NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                ip_address TEXT,
                user_agent TEXT
            );",
        )?;
        Ok(())
    }

    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    #[must_use]
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Caps how long a writer will wait to acquire the database lock before
    /// giving up. `VaultService` sets this from `VaultConfig::operation_timeout`
    /// at construction time; once it elapses a blocked operation fails with
    /// `SQLITE_BUSY`, which `VaultError::from` maps to `VaultError::Timeout`.
    pub fn set_busy_timeout(&self, timeout: std::time::Duration) -> VaultResult<()> {
        self.conn.busy_timeout(timeout)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_creates_all_seven_tables() {
        let db = Db::open_in_memory().unwrap();
        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        for expected in [
            "audit_logs",
            "cell_keys",
            "cell_permissions",
            "cells",
            "rotation_schedules",
            "secret_versions",
            "secrets",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
        }
    }

    #[test]
    fn foreign_keys_pragma_is_on() {
        let db = Db::open_in_memory().unwrap();
        let fk: i64 = db
            .conn()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn busy_timeout_expiry_surfaces_as_vault_timeout() {
        use crate::error::VaultError;

        let path = tempfile::NamedTempFile::new().unwrap().into_temp_path();
        let holder = Db::open(&path).unwrap();
        holder.conn().execute_batch("BEGIN IMMEDIATE;").unwrap();

        let waiter = Db::open(&path).unwrap();
        waiter.set_busy_timeout(std::time::Duration::from_millis(50)).unwrap();

        let result = waiter
            .conn()
            .execute("INSERT INTO cells (id, name, created_at, updated_at, rotation_period, metadata) \
                      VALUES ('c1', 'c1', 0, 0, 30, '{}')", []);

        holder.conn().execute_batch("COMMIT;").unwrap();

        let err = result.unwrap_err();
        assert!(matches!(VaultError::from(err), VaultError::Timeout));
    }

    #[test]
    fn reopening_an_existing_file_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.sqlite3");
        {
            let _db = Db::open(&path).unwrap();
        }
        let _db2 = Db::open(&path).unwrap();
    }
}
