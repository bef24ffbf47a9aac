//! `CellRepository`: cell lifecycle (create/update/delete/get/list).

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value as Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{VaultError, VaultResult};
use crate::model::Cell;

fn row_to_cell(row: &rusqlite::Row<'_>) -> rusqlite::Result<Cell> {
    let created_at: i64 = row.get(4)?;
    let updated_at: i64 = row.get(5)?;
    let metadata_str: String = row.get(6)?;
    Ok(Cell {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        rotation_period_days: row.get::<_, i64>(3)? as u32,
        created_at: OffsetDateTime::from_unix_timestamp(created_at).unwrap_or(OffsetDateTime::UNIX_EPOCH),
        updated_at: OffsetDateTime::from_unix_timestamp(updated_at).unwrap_or(OffsetDateTime::UNIX_EPOCH),
        metadata: serde_json::from_str(&metadata_str).unwrap_or(Json::Null),
    })
}

const SELECT_COLUMNS: &str =
    "id, name, description, rotation_period, created_at, updated_at, metadata";

pub struct CellRepository<'a> {
    conn: &'a Connection,
}

impl<'a> CellRepository<'a> {
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Fails `AlreadyExists` if `name` is taken.
    pub fn create(
        &self,
        name: &str,
        description: Option<&str>,
        rotation_period_days: u32,
        metadata: Json,
    ) -> VaultResult<Cell> {
        let exists: Option<String> = self
            .conn
            .query_row("SELECT id FROM cells WHERE name = ?1", params![name], |row| row.get(0))
            .optional()?;
        if exists.is_some() {
            return Err(VaultError::AlreadyExists);
        }

        let id = Uuid::new_v4().to_string();
        let now = OffsetDateTime::now_utc();
        let metadata_str = metadata.to_string();

        self.conn.execute(
            "INSERT INTO cells (id, name, description, created_at, updated_at, rotation_period, metadata) \
             VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6)",
            params![id, name, description, now.unix_timestamp(), rotation_period_days, metadata_str],
        )?;

        Ok(Cell {
            id,
            name: name.to_string(),
            description: description.map(str::to_string),
            rotation_period_days,
            metadata,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get(&self, cell_id: &str) -> VaultResult<Cell> {
        self.conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM cells WHERE id = ?1"),
                params![cell_id],
                row_to_cell,
            )
            .optional()?
            .ok_or(VaultError::NotFound)
    }

    pub fn list(&self) -> VaultResult<Vec<Cell>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {SELECT_COLUMNS} FROM cells ORDER BY name"))?;
        let cells = stmt
            .query_map([], row_to_cell)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cells)
    }

    pub fn update(
        &self,
        cell_id: &str,
        description: Option<&str>,
        rotation_period_days: Option<u32>,
        metadata: Option<Json>,
    ) -> VaultResult<Cell> {
        let existing = self.get(cell_id)?;
        let description = description.or(existing.description.as_deref());
        let rotation_period_days = rotation_period_days.unwrap_or(existing.rotation_period_days);
        let metadata = metadata.unwrap_or(existing.metadata);
        let now = OffsetDateTime::now_utc();
        let metadata_str = metadata.to_string();

        self.conn.execute(
            "UPDATE cells SET description = ?1, rotation_period = ?2, metadata = ?3, updated_at = ?4 \
             WHERE id = ?5",
            params![description, rotation_period_days, metadata_str, now.unix_timestamp(), cell_id],
        )?;

        Ok(Cell {
            id: cell_id.to_string(),
            name: existing.name,
            description: description.map(str::to_string),
            rotation_period_days,
            metadata,
            created_at: existing.created_at,
            updated_at: now,
        })
    }

    /// Cascades to secrets, versions, keys, permissions, and rotation
    /// schedule via `ON DELETE CASCADE` foreign keys.
    pub fn delete(&self, cell_id: &str) -> VaultResult<()> {
        let changed = self.conn.execute("DELETE FROM cells WHERE id = ?1", params![cell_id])?;
        if changed == 0 {
            return Err(VaultError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Db;

    #[test]
    fn create_then_get_roundtrips() {
        let db = Db::open_in_memory().unwrap();
        let repo = CellRepository::new(db.conn());
        let created = repo.create("c1", Some("desc"), 30, Json::Null).unwrap();
        let fetched = repo.get(&created.id).unwrap();
        assert_eq!(fetched.name, "c1");
        assert_eq!(fetched.rotation_period_days, 30);
    }

    #[test]
    fn duplicate_name_fails_already_exists() {
        let db = Db::open_in_memory().unwrap();
        let repo = CellRepository::new(db.conn());
        repo.create("c1", None, 30, Json::Null).unwrap();
        let err = repo.create("c1", None, 30, Json::Null).unwrap_err();
        assert!(matches!(err, VaultError::AlreadyExists | VaultError::Conflict));
    }

    #[test]
    fn delete_cascades_to_secrets_and_keys() {
        let db = Db::open_in_memory().unwrap();
        let repo = CellRepository::new(db.conn());
        let cell = repo.create("c1", None, 30, Json::Null).unwrap();

        db.conn()
            .execute(
                "INSERT INTO cell_keys (id, cell_id, version, created_at, active, wrapped_key) \
                 VALUES ('k1', ?1, 1, 0, 1, 'wrapped')",
                params![cell.id],
            )
            .unwrap();
        db.conn()
            .execute(
                "INSERT INTO secrets (id, cell_id, key, ciphertext, version, created_at, updated_at, metadata) \
                 VALUES ('s1', ?1, 'k', 'ct', 1, 0, 0, '{}')",
                params![cell.id],
            )
            .unwrap();

        repo.delete(&cell.id).unwrap();

        let key_count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM cell_keys WHERE cell_id = ?1", params![cell.id], |row| row.get(0))
            .unwrap();
        let secret_count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM secrets WHERE cell_id = ?1", params![cell.id], |row| row.get(0))
            .unwrap();
        assert_eq!(key_count, 0);
        assert_eq!(secret_count, 0);
    }

    #[test]
    fn delete_missing_fails_not_found() {
        let db = Db::open_in_memory().unwrap();
        let repo = CellRepository::new(db.conn());
        let err = repo.delete("missing").unwrap_err();
        assert!(matches!(err, VaultError::NotFound));
    }
}
