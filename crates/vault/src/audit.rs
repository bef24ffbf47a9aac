//! `AuditSink`: append-only audit trail. There is deliberately no
//! `update`/`delete` method on this type — the append-only guarantee is
//! structural, not a runtime check.

use rusqlite::{Connection, params};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::VaultResult;
use crate::model::{AuditRecord, NewAuditRecord};

pub struct AuditSink<'a> {
    conn: &'a Connection,
}

impl<'a> AuditSink<'a> {
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Appends one audit record. Intended to run inside the same
    /// transaction as the primary write it documents, so a failure here
    /// rolls back the whole operation.
    pub fn append(&self, record: NewAuditRecord) -> VaultResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = OffsetDateTime::now_utc();
        let metadata_str = record.metadata.to_string();

        self.conn.execute(
            "INSERT INTO audit_logs \
             (id, timestamp, user_id, action, resource_type, resource_id, cell_id, metadata, ip_address, user_agent) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                now.unix_timestamp(),
                record.user_id,
                record.action,
                record.resource_type,
                record.resource_id,
                record.cell_id,
                metadata_str,
                record.ip_address,
                record.user_agent,
            ],
        )?;

        Ok(id)
    }

    /// Total row count. Exposed for tests verifying the append-only
    /// invariant; not a production query path.
    pub fn count(&self) -> VaultResult<i64> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM audit_logs", [], |row| row.get(0))?)
    }

    /// Rows for a given cell, most recent first. Used by the api crate to
    /// expose an audit trail endpoint.
    pub fn list_for_cell(&self, cell_id: &str) -> VaultResult<Vec<AuditRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, user_id, action, resource_type, resource_id, cell_id, metadata, \
                    ip_address, user_agent \
             FROM audit_logs WHERE cell_id = ?1 ORDER BY timestamp DESC",
        )?;
        let rows = stmt
            .query_map(params![cell_id], |row| {
                let timestamp: i64 = row.get(1)?;
                let metadata_str: String = row.get(7)?;
                Ok(AuditRecord {
                    id: row.get(0)?,
                    timestamp: OffsetDateTime::from_unix_timestamp(timestamp).unwrap_or(OffsetDateTime::UNIX_EPOCH),
                    user_id: row.get(2)?,
                    action: row.get(3)?,
                    resource_type: row.get(4)?,
                    resource_id: row.get(5)?,
                    cell_id: row.get(6)?,
                    metadata: serde_json::from_str(&metadata_str).unwrap_or(serde_json::Value::Null),
                    ip_address: row.get(8)?,
                    user_agent: row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
