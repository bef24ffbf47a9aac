//! `VaultService`: the façade composing the authorizer, crypto/storage
//! layers, and audit sink into the operations the api crate (or any other
//! embedder) calls.
//!
//! For every public operation: (1) authorize, (2) perform the
//! cryptographic and storage work inside a single transaction, (3) append
//! audit, (4) commit, (5) let transient key material fall out of scope and
//! zeroize. If any step fails, the transaction rolls back and no audit
//! record is persisted for the attempted action — except an authorization
//! failure, which is always audited in its own short transaction.

use serde_json::Value as Json;
use tracing::{info, warn};

use crate::audit::AuditSink;
use crate::cell::CellRepository;
use crate::config::VaultConfig;
use crate::custody::KeyCustody;
use crate::db::Db;
use crate::error::{VaultError, VaultResult};
use crate::model::{Action, AuditRecord, Cell, Grant, NewAuditRecord, Secret, Subject};
use crate::registry::KeyRegistry;
use crate::rotation::RotationEngine;
use crate::store::SecretStore;

use crate::authz::Authorizer;

pub struct VaultService {
    db: Db,
    custody: Box<dyn KeyCustody>,
    config: VaultConfig,
}

impl VaultService {
    #[must_use]
    pub fn new(db: Db, custody: Box<dyn KeyCustody>, config: VaultConfig) -> Self {
        if let Err(err) = db.set_busy_timeout(config.operation_timeout) {
            warn!(error = %err, "failed to apply operation timeout to database connection");
        }
        Self { db, custody, config }
    }

    fn authorize(&mut self, subject: &Subject, cell_id: &str, action: Action, resource_id: &str) -> VaultResult<()> {
        let allowed = Authorizer::new(self.db.conn()).may(subject, cell_id, action)?;
        if allowed {
            return Ok(());
        }

        let tx = self.db.conn_mut().transaction()?;
        AuditSink::new(&tx).append(
            NewAuditRecord::new("auth.denied", "cell")
                .with_subject(subject)
                .with_cell(cell_id)
                .with_resource(resource_id),
        )?;
        tx.commit()?;

        warn!(cell_id, resource_id, "authorization denied");
        Err(VaultError::Forbidden)
    }

    // ---- Cells (admin) ----

    pub fn create_cell(
        &mut self,
        subject: &Subject,
        name: &str,
        description: Option<&str>,
        rotation_period_days: u32,
        metadata: Json,
    ) -> VaultResult<Cell> {
        if !matches!(subject, Subject::Superuser) {
            // Cell creation has no existing cell to scope the check to;
            // only a superuser may mint new cells.
            return Err(VaultError::Forbidden);
        }

        let tx = self.db.conn_mut().transaction()?;
        let cell = CellRepository::new(&tx).create(name, description, rotation_period_days, metadata)?;

        // Mint the cell's first key so it's immediately writable, and
        // grant its creator admin on it (mirrors the original endpoint
        // granting the creating user admin permission at creation time).
        RotationEngine::new(&tx, self.custody.as_ref()).rotate(&cell.id)?;
        if let Subject::User(user_id) = subject {
            tx.execute(
                "INSERT INTO cell_permissions (id, cell_id, user_id, permission, created_at, expires_at) \
                 VALUES (?1, ?2, ?3, 'admin', ?4, NULL)",
                rusqlite::params![
                    uuid::Uuid::new_v4().to_string(),
                    cell.id,
                    user_id,
                    time::OffsetDateTime::now_utc().unix_timestamp(),
                ],
            )?;
        }

        AuditSink::new(&tx).append(
            NewAuditRecord::new("cell.create", "cell")
                .with_subject(subject)
                .with_cell(&cell.id),
        )?;
        tx.commit()?;
        info!(cell_id = %cell.id, "created cell");
        Ok(cell)
    }

    pub fn update_cell(
        &mut self,
        subject: &Subject,
        cell_id: &str,
        description: Option<&str>,
        rotation_period_days: Option<u32>,
        metadata: Option<Json>,
    ) -> VaultResult<Cell> {
        self.authorize(subject, cell_id, Action::Admin, cell_id)?;
        let tx = self.db.conn_mut().transaction()?;
        let cell = CellRepository::new(&tx).update(cell_id, description, rotation_period_days, metadata)?;
        AuditSink::new(&tx).append(
            NewAuditRecord::new("cell.update", "cell")
                .with_subject(subject)
                .with_cell(cell_id),
        )?;
        tx.commit()?;
        Ok(cell)
    }

    pub fn delete_cell(&mut self, subject: &Subject, cell_id: &str) -> VaultResult<()> {
        self.authorize(subject, cell_id, Action::Admin, cell_id)?;
        let tx = self.db.conn_mut().transaction()?;
        CellRepository::new(&tx).delete(cell_id)?;
        AuditSink::new(&tx).append(
            NewAuditRecord::new("cell.delete", "cell")
                .with_subject(subject)
                .with_cell(cell_id),
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_cell(&self, cell_id: &str) -> VaultResult<Cell> {
        CellRepository::new(self.db.conn()).get(cell_id)
    }

    pub fn list_cells(&self) -> VaultResult<Vec<Cell>> {
        CellRepository::new(self.db.conn()).list()
    }

    // ---- Secrets ----

    pub fn create_secret(
        &mut self,
        subject: &Subject,
        cell_id: &str,
        key: &str,
        plaintext: &[u8],
        metadata: Json,
    ) -> VaultResult<Secret> {
        self.authorize(subject, cell_id, Action::Write, &format!("{cell_id}/{key}"))?;
        let tx = self.db.conn_mut().transaction()?;
        let secret = {
            let store = SecretStore::new(&tx, self.custody.as_ref(), self.config.max_secret_bytes);
            store.create(cell_id, key, plaintext, metadata)?
        };
        AuditSink::new(&tx).append(
            NewAuditRecord::new("secret.create", "secret")
                .with_subject(subject)
                .with_cell(cell_id)
                .with_resource(format!("{cell_id}/{key}")),
        )?;
        tx.commit()?;
        Ok(secret)
    }

    pub fn update_secret(
        &mut self,
        subject: &Subject,
        cell_id: &str,
        key: &str,
        plaintext: &[u8],
        metadata: Option<Json>,
    ) -> VaultResult<Secret> {
        self.authorize(subject, cell_id, Action::Write, &format!("{cell_id}/{key}"))?;
        let tx = self.db.conn_mut().transaction()?;
        let secret = {
            let store = SecretStore::new(&tx, self.custody.as_ref(), self.config.max_secret_bytes);
            store.update(cell_id, key, plaintext, metadata)?
        };
        AuditSink::new(&tx).append(
            NewAuditRecord::new("secret.update", "secret")
                .with_subject(subject)
                .with_cell(cell_id)
                .with_resource(format!("{cell_id}/{key}")),
        )?;
        tx.commit()?;
        Ok(secret)
    }

    pub fn read_secret(
        &mut self,
        subject: &Subject,
        cell_id: &str,
        key: &str,
        version: Option<u32>,
    ) -> VaultResult<Vec<u8>> {
        self.authorize(subject, cell_id, Action::Read, &format!("{cell_id}/{key}"))?;
        let tx = self.db.conn_mut().transaction()?;
        let plaintext = {
            let store = SecretStore::new(&tx, self.custody.as_ref(), self.config.max_secret_bytes);
            store.read(cell_id, key, version)?
        };
        AuditSink::new(&tx).append(
            NewAuditRecord::new("secret.read", "secret")
                .with_subject(subject)
                .with_cell(cell_id)
                .with_resource(format!("{cell_id}/{key}")),
        )?;
        tx.commit()?;
        Ok(plaintext)
    }

    pub fn delete_secret(&mut self, subject: &Subject, cell_id: &str, key: &str) -> VaultResult<()> {
        self.authorize(subject, cell_id, Action::Write, &format!("{cell_id}/{key}"))?;
        let tx = self.db.conn_mut().transaction()?;
        {
            let store = SecretStore::new(&tx, self.custody.as_ref(), self.config.max_secret_bytes);
            store.delete(cell_id, key)?;
        }
        AuditSink::new(&tx).append(
            NewAuditRecord::new("secret.delete", "secret")
                .with_subject(subject)
                .with_cell(cell_id)
                .with_resource(format!("{cell_id}/{key}")),
        )?;
        tx.commit()?;
        Ok(())
    }

    // ---- Permissions (admin) ----

    pub fn grant_permission(
        &mut self,
        subject: &Subject,
        cell_id: &str,
        user_id: &str,
        grant: Grant,
        expires_at: Option<time::OffsetDateTime>,
    ) -> VaultResult<()> {
        self.authorize(subject, cell_id, Action::Admin, cell_id)?;
        let tx = self.db.conn_mut().transaction()?;
        tx.execute(
            "INSERT INTO cell_permissions (id, cell_id, user_id, permission, created_at, expires_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(cell_id, user_id) DO UPDATE SET permission = excluded.permission, expires_at = excluded.expires_at",
            rusqlite::params![
                uuid::Uuid::new_v4().to_string(),
                cell_id,
                user_id,
                grant.as_str(),
                time::OffsetDateTime::now_utc().unix_timestamp(),
                expires_at.map(time::OffsetDateTime::unix_timestamp),
            ],
        )?;
        AuditSink::new(&tx).append(
            NewAuditRecord::new("permission.grant", "cell_permission")
                .with_subject(subject)
                .with_cell(cell_id)
                .with_resource(user_id),
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn revoke_permission(&mut self, subject: &Subject, cell_id: &str, user_id: &str) -> VaultResult<()> {
        self.authorize(subject, cell_id, Action::Admin, cell_id)?;
        let tx = self.db.conn_mut().transaction()?;
        let changed = tx.execute(
            "DELETE FROM cell_permissions WHERE cell_id = ?1 AND user_id = ?2",
            rusqlite::params![cell_id, user_id],
        )?;
        if changed == 0 {
            return Err(VaultError::NotFound);
        }
        AuditSink::new(&tx).append(
            NewAuditRecord::new("permission.revoke", "cell_permission")
                .with_subject(subject)
                .with_cell(cell_id)
                .with_resource(user_id),
        )?;
        tx.commit()?;
        Ok(())
    }

    // ---- Rotation (admin) ----

    pub fn rotate_cell_key(&mut self, subject: &Subject, cell_id: &str) -> VaultResult<(u32, u32)> {
        self.authorize(subject, cell_id, Action::Admin, cell_id)?;
        let tx = self.db.conn_mut().transaction()?;
        let result = RotationEngine::new(&tx, self.custody.as_ref()).rotate(cell_id)?;
        tx.commit()?;
        Ok(result)
    }

    pub fn schedule_rotation(&mut self, subject: &Subject, cell_id: &str, interval_days: u32) -> VaultResult<()> {
        self.authorize(subject, cell_id, Action::Admin, cell_id)?;
        let tx = self.db.conn_mut().transaction()?;
        RotationEngine::new(&tx, self.custody.as_ref()).schedule(cell_id, interval_days)?;
        tx.commit()?;
        Ok(())
    }

    /// Runs the periodic rotation scan. Intended to be driven by a
    /// `tokio::time::interval` in the api crate's binary at most once a
    /// minute; not gated by `authorize` since it is invoked by the process
    /// itself, not a subject.
    pub fn run_scheduler_tick(&mut self, now: time::OffsetDateTime) -> VaultResult<Vec<String>> {
        let tx = self.db.conn_mut().transaction()?;
        let rotated = RotationEngine::new(&tx, self.custody.as_ref()).run_scheduler_tick(now)?;
        tx.commit()?;
        Ok(rotated)
    }

    // ---- Audit ----

    pub fn list_audit(&self, subject: &Subject, cell_id: &str) -> VaultResult<Vec<AuditRecord>> {
        let allowed = Authorizer::new(self.db.conn()).may(subject, cell_id, Action::Admin)?;
        if !allowed {
            return Err(VaultError::Forbidden);
        }
        AuditSink::new(self.db.conn()).list_for_cell(cell_id)
    }

    /// Exposed for callers that need a lower-level view of a cell's key
    /// lineage (e.g. an admin endpoint listing rotation history).
    pub fn active_key_version(&self, cell_id: &str) -> VaultResult<u32> {
        Ok(KeyRegistry::new(self.db.conn()).active_key(cell_id)?.version)
    }
}
