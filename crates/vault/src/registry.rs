//! `KeyRegistry`: persists and retrieves versioned wrapped cell keys,
//! selecting the active version.

use rusqlite::{Connection, OptionalExtension, params};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{VaultError, VaultResult};
use crate::model::CellKeyRecord;

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<CellKeyRecord> {
    let created_at_secs: i64 = row.get(4)?;
    Ok(CellKeyRecord {
        id: row.get(0)?,
        cell_id: row.get(1)?,
        version: row.get::<_, i64>(2)? as u32,
        wrapped_key: row.get(5)?,
        active: row.get::<_, i64>(3)? != 0,
        created_at: OffsetDateTime::from_unix_timestamp(created_at_secs)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH),
    })
}

/// Operations on `cell_keys`.
pub struct KeyRegistry<'a> {
    conn: &'a Connection,
}

impl<'a> KeyRegistry<'a> {
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// The unique row with `active = true` for `cell_id`. Fails
    /// `NoActiveKey` if absent.
    pub fn active_key(&self, cell_id: &str) -> VaultResult<CellKeyRecord> {
        self.conn
            .query_row(
                "SELECT id, cell_id, version, active, created_at, wrapped_key \
                 FROM cell_keys WHERE cell_id = ?1 AND active = 1",
                params![cell_id],
                row_to_record,
            )
            .optional()?
            .ok_or(VaultError::NoActiveKey)
    }

    /// The row at the given version for `cell_id`. Fails `KeyNotFound` if
    /// absent.
    pub fn key_at_version(&self, cell_id: &str, version: u32) -> VaultResult<CellKeyRecord> {
        self.conn
            .query_row(
                "SELECT id, cell_id, version, active, created_at, wrapped_key \
                 FROM cell_keys WHERE cell_id = ?1 AND version = ?2",
                params![cell_id, version],
                row_to_record,
            )
            .optional()?
            .ok_or(VaultError::KeyNotFound)
    }

    /// Inserts a new `cell_keys` row at `version = max + 1`, transactionally
    /// deactivating the previous active row. Callers are expected to run
    /// this inside a transaction already owned by the caller (e.g.
    /// `RotationEngine`); a unique-constraint violation on `(cell_id,
    /// version)` surfaces as `VaultError::Conflict` when two rotations race.
    pub fn install_new_version(&self, cell_id: &str, wrapped: &str) -> VaultResult<u32> {
        let current_max: Option<i64> = self
            .conn
            .query_row(
                "SELECT MAX(version) FROM cell_keys WHERE cell_id = ?1",
                params![cell_id],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        let next_version = current_max.unwrap_or(0) + 1;

        self.conn.execute(
            "UPDATE cell_keys SET active = 0 WHERE cell_id = ?1 AND active = 1",
            params![cell_id],
        )?;

        self.conn.execute(
            "INSERT INTO cell_keys (id, cell_id, version, created_at, active, wrapped_key) \
             VALUES (?1, ?2, ?3, ?4, 1, ?5)",
            params![
                Uuid::new_v4().to_string(),
                cell_id,
                next_version,
                OffsetDateTime::now_utc().unix_timestamp(),
                wrapped,
            ],
        )?;

        Ok(next_version as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Db;

    #[test]
    fn no_active_key_is_no_active_key_error() {
        let db = Db::open_in_memory().unwrap();
        let registry = KeyRegistry::new(db.conn());
        let err = registry.active_key("c1").unwrap_err();
        assert!(matches!(err, VaultError::NoActiveKey));
    }

    #[test]
    fn install_new_version_starts_at_one_and_activates() {
        let db = Db::open_in_memory().unwrap();
        let registry = KeyRegistry::new(db.conn());
        let v = registry.install_new_version("c1", "wrapped-1").unwrap();
        assert_eq!(v, 1);
        let active = registry.active_key("c1").unwrap();
        assert_eq!(active.version, 1);
        assert!(active.active);
    }

    #[test]
    fn install_new_version_deactivates_previous() {
        let db = Db::open_in_memory().unwrap();
        let registry = KeyRegistry::new(db.conn());
        registry.install_new_version("c1", "wrapped-1").unwrap();
        let v2 = registry.install_new_version("c1", "wrapped-2").unwrap();
        assert_eq!(v2, 2);

        let active = registry.active_key("c1").unwrap();
        assert_eq!(active.version, 2);

        let old = registry.key_at_version("c1", 1).unwrap();
        assert!(!old.active);
    }

    #[test]
    fn key_at_version_missing_is_key_not_found() {
        let db = Db::open_in_memory().unwrap();
        let registry = KeyRegistry::new(db.conn());
        registry.install_new_version("c1", "wrapped-1").unwrap();
        let err = registry.key_at_version("c1", 9).unwrap_err();
        assert!(matches!(err, VaultError::KeyNotFound));
    }

    #[test]
    fn exactly_one_active_key_after_rotation() {
        let db = Db::open_in_memory().unwrap();
        let registry = KeyRegistry::new(db.conn());
        registry.install_new_version("c1", "wrapped-1").unwrap();
        registry.install_new_version("c1", "wrapped-2").unwrap();
        registry.install_new_version("c1", "wrapped-3").unwrap();

        let active_count: i64 = db
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM cell_keys WHERE cell_id = 'c1' AND active = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(active_count, 1);
    }
}
