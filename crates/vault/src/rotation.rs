//! `RotationEngine`: mints new cell keys, wraps them, flips the active
//! pointer, and reschedules the next rotation.

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::AuditSink;
use crate::crypto::wrap_data_key;
use crate::custody::KeyCustody;
use crate::error::VaultResult;
use crate::model::NewAuditRecord;
use crate::registry::KeyRegistry;

pub struct RotationEngine<'a> {
    conn: &'a Connection,
    custody: &'a dyn KeyCustody,
}

impl<'a> RotationEngine<'a> {
    #[must_use]
    pub fn new(conn: &'a Connection, custody: &'a dyn KeyCustody) -> Self {
        Self { conn, custody }
    }

    /// Runs the five-step rotation protocol for `cell_id`:
    /// 1. generate a fresh data key,
    /// 2. wrap it under the master key bound to `cell_id`,
    /// 3. atomically deactivate the old active row and insert the new one,
    /// 4. advance the cell's `updated_at` and, if present, the rotation
    ///    schedule's `last_rotation`/`next_rotation`,
    /// 5. emit a `cell.key.rotate` audit record.
    ///
    /// Returns `(old_version, new_version)`; `old_version` is `0` if the
    /// cell had no active key before this call.
    pub fn rotate(&self, cell_id: &str) -> VaultResult<(u32, u32)> {
        let registry = KeyRegistry::new(self.conn);
        let old_version = registry.active_key(cell_id).map(|k| k.version).unwrap_or(0);

        let data_key = self.custody.generate_data_key()?;
        let wrapped = wrap_data_key(self.custody.master_key_material(), cell_id, &data_key)?;

        let new_version = registry.install_new_version(cell_id, &wrapped)?;

        let now = OffsetDateTime::now_utc();
        self.conn.execute(
            "UPDATE cells SET updated_at = ?1 WHERE id = ?2",
            params![now.unix_timestamp(), cell_id],
        )?;

        let schedule: Option<(i64,)> = self
            .conn
            .query_row(
                "SELECT interval_days FROM rotation_schedules WHERE cell_id = ?1 AND is_active = 1",
                params![cell_id],
                |row| Ok((row.get(0)?,)),
            )
            .optional()?;
        if let Some((interval_days,)) = schedule {
            let next = now + time::Duration::days(interval_days);
            self.conn.execute(
                "UPDATE rotation_schedules SET last_rotation = ?1, next_rotation = ?2 \
                 WHERE cell_id = ?3 AND is_active = 1",
                params![now.unix_timestamp(), next.unix_timestamp(), cell_id],
            )?;
        }

        let audit = AuditSink::new(self.conn);
        audit.append(
            NewAuditRecord::new("cell.key.rotate", "cell_key")
                .with_cell(cell_id)
                .with_metadata(json!({ "old_version": old_version, "new_version": new_version })),
        )?;

        info!(cell_id, old_version, new_version, "rotated cell key");
        Ok((old_version, new_version))
    }

    /// Installs a rotation schedule for `cell_id`, active immediately with
    /// `next_rotation = now + interval_days`.
    pub fn schedule(&self, cell_id: &str, interval_days: u32) -> VaultResult<()> {
        let now = OffsetDateTime::now_utc();
        let next = now + time::Duration::days(i64::from(interval_days));
        self.conn.execute(
            "INSERT INTO rotation_schedules (id, cell_id, interval_days, last_rotation, next_rotation, is_active) \
             VALUES (?1, ?2, ?3, ?4, ?5, 1)",
            params![
                Uuid::new_v4().to_string(),
                cell_id,
                interval_days,
                now.unix_timestamp(),
                next.unix_timestamp(),
            ],
        )?;
        Ok(())
    }

    /// Scans `rotation_schedules` for rows due at or before `now` and
    /// rotates each matching cell. Continues past per-cell failures,
    /// recording them to the audit sink, so one bad cell doesn't stall the
    /// scan. Returns the ids of cells successfully rotated.
    pub fn run_scheduler_tick(&self, now: OffsetDateTime) -> VaultResult<Vec<String>> {
        let due_cells: Vec<String> = {
            let mut stmt = self.conn.prepare(
                "SELECT cell_id FROM rotation_schedules WHERE is_active = 1 AND next_rotation <= ?1",
            )?;
            stmt.query_map(params![now.unix_timestamp()], |row| row.get(0))?
                .collect::<Result<_, _>>()?
        };

        let mut rotated = Vec::new();
        for cell_id in due_cells {
            match self.rotate(&cell_id) {
                Ok(_) => rotated.push(cell_id),
                Err(err) => {
                    warn!(cell_id, error = %err, "scheduled rotation failed");
                    let audit = AuditSink::new(self.conn);
                    let _ = audit.append(
                        NewAuditRecord::new("cell.key.rotate", "cell_key")
                            .with_cell(&cell_id)
                            .with_metadata(json!({ "error": err.kind() })),
                    );
                }
            }
        }
        Ok(rotated)
    }
}
