//! Domain types shared across the vault core: entities mirrored from the
//! persistence schema, plus the subject/action/grant vocabulary the
//! authorizer evaluates.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use time::OffsetDateTime;

/// An isolated cryptographic context: its own key lineage, permission set,
/// and secrets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub rotation_period_days: u32,
    pub metadata: Json,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A versioned secret's current-state row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    pub id: String,
    pub cell_id: String,
    pub key: String,
    pub current_ciphertext: String,
    pub current_version: u32,
    pub metadata: Json,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// One immutable historical state of a [`Secret`]. Carries the
/// `cell_key_version` that was active when this version was written, so a
/// later rotation never breaks the ability to decrypt it (REQUIRED option
/// (a) for resolving the write-time key binding).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretVersion {
    pub id: String,
    pub secret_id: String,
    pub version: u32,
    pub ciphertext: String,
    pub cell_key_version: u32,
    pub created_at: OffsetDateTime,
}

/// A wrapped cell key row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellKeyRecord {
    pub id: String,
    pub cell_id: String,
    pub version: u32,
    pub wrapped_key: String,
    pub active: bool,
    pub created_at: OffsetDateTime,
}

/// Grants covered by a permission row, ordered by the lattice admin ⊇
/// write ⊇ read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grant {
    Read,
    Write,
    Admin,
}

impl Grant {
    /// Whether this grant covers the requested action, per the lattice
    /// admin ⊇ write ⊇ read.
    #[must_use]
    pub const fn covers(self, action: Action) -> bool {
        match (self, action) {
            (Grant::Admin, _) => true,
            (Grant::Write, Action::Write | Action::Read) => true,
            (Grant::Read, Action::Read) => true,
            _ => false,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Grant::Read => "read",
            Grant::Write => "write",
            Grant::Admin => "admin",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(Grant::Read),
            "write" => Some(Grant::Write),
            "admin" => Some(Grant::Admin),
            _ => None,
        }
    }
}

/// The action being attempted against a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
    Admin,
}

/// A permission grant on a cell for a subject, with an optional expiry. An
/// expired row is treated as absent by the authorizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellPermission {
    pub id: String,
    pub cell_id: String,
    pub user_id: String,
    pub grant: Grant,
    pub created_at: OffsetDateTime,
    pub expires_at: Option<OffsetDateTime>,
}

/// The caller identity passed into every core operation. Mirrors the
/// source's `current_user.is_superuser` bypass: a superuser is authorized
/// for every action on every cell without a stored permission row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Superuser,
    User(String),
}

impl Subject {
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Subject::Superuser => None,
            Subject::User(id) => Some(id),
        }
    }
}

/// A cell's automatic rotation schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationSchedule {
    pub id: String,
    pub cell_id: String,
    pub interval_days: u32,
    pub last_rotation: OffsetDateTime,
    pub next_rotation: OffsetDateTime,
    pub is_active: bool,
}

/// An append-only audit record. Never mutated or deleted by core code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    pub timestamp: OffsetDateTime,
    pub user_id: Option<String>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub cell_id: Option<String>,
    pub metadata: Json,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// The record used to append a new audit row; `id`/`timestamp` are assigned
/// by the [`crate::audit::AuditSink`].
#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    pub user_id: Option<String>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub cell_id: Option<String>,
    pub metadata: Json,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl NewAuditRecord {
    #[must_use]
    pub fn new(action: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            user_id: None,
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            cell_id: None,
            metadata: Json::Null,
            ip_address: None,
            user_agent: None,
        }
    }

    #[must_use]
    pub fn with_subject(mut self, subject: &Subject) -> Self {
        self.user_id = subject.user_id().map(str::to_string);
        self
    }

    #[must_use]
    pub fn with_cell(mut self, cell_id: impl Into<String>) -> Self {
        self.cell_id = Some(cell_id.into());
        self
    }

    #[must_use]
    pub fn with_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Json) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_lattice_admin_covers_everything() {
        assert!(Grant::Admin.covers(Action::Read));
        assert!(Grant::Admin.covers(Action::Write));
        assert!(Grant::Admin.covers(Action::Admin));
    }

    #[test]
    fn grant_lattice_write_covers_read_and_write_only() {
        assert!(Grant::Write.covers(Action::Read));
        assert!(Grant::Write.covers(Action::Write));
        assert!(!Grant::Write.covers(Action::Admin));
    }

    #[test]
    fn grant_lattice_read_covers_read_only() {
        assert!(Grant::Read.covers(Action::Read));
        assert!(!Grant::Read.covers(Action::Write));
        assert!(!Grant::Read.covers(Action::Admin));
    }
}
