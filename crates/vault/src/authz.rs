//! Authorization checks: `may(subject, cell, action)`.

use rusqlite::{Connection, OptionalExtension};
use time::OffsetDateTime;

use crate::error::VaultResult;
use crate::model::{Action, Grant, Subject};

/// Evaluates permission checks against the `cell_permissions` table.
pub struct Authorizer<'a> {
    conn: &'a Connection,
}

impl<'a> Authorizer<'a> {
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// True when `subject` is a superuser, or when a `cell_permissions` row
    /// exists for `(cell_id, subject)` whose grant covers `action` and whose
    /// `expires_at` is null or in the future. An expired row is treated as
    /// absent.
    pub fn may(&self, subject: &Subject, cell_id: &str, action: Action) -> VaultResult<bool> {
        let Subject::User(user_id) = subject else {
            return Ok(true);
        };

        let now = OffsetDateTime::now_utc();
        let grant_str: Option<String> = self
            .conn
            .query_row(
                "SELECT permission FROM cell_permissions \
                 WHERE cell_id = ?1 AND user_id = ?2 \
                   AND (expires_at IS NULL OR expires_at > ?3)",
                rusqlite::params![cell_id, user_id, now.unix_timestamp()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(grant_str
            .and_then(|s| Grant::parse(&s))
            .is_some_and(|grant| grant.covers(action)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE cell_permissions (
                id TEXT PRIMARY KEY,
                cell_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                permission TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER,
                UNIQUE(cell_id, user_id)
            );",
        )
        .unwrap();
        conn
    }

    fn insert_permission(conn: &Connection, cell_id: &str, user_id: &str, grant: &str, expires_at: Option<i64>) {
        conn.execute(
            "INSERT INTO cell_permissions (id, cell_id, user_id, permission, created_at, expires_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                uuid::Uuid::new_v4().to_string(),
                cell_id,
                user_id,
                grant,
                OffsetDateTime::now_utc().unix_timestamp(),
                expires_at,
            ],
        )
        .unwrap();
    }

    #[test]
    fn superuser_may_do_anything() {
        let conn = open_test_db();
        let authz = Authorizer::new(&conn);
        assert!(authz.may(&Subject::Superuser, "c1", Action::Admin).unwrap());
    }

    #[test]
    fn user_without_permission_row_denied() {
        let conn = open_test_db();
        let authz = Authorizer::new(&conn);
        let subject = Subject::User("u1".into());
        assert!(!authz.may(&subject, "c1", Action::Read).unwrap());
    }

    #[test]
    fn grant_lattice_is_monotone() {
        let conn = open_test_db();
        insert_permission(&conn, "c1", "u1", "write", None);
        let authz = Authorizer::new(&conn);
        let subject = Subject::User("u1".into());
        assert!(authz.may(&subject, "c1", Action::Read).unwrap());
        assert!(authz.may(&subject, "c1", Action::Write).unwrap());
        assert!(!authz.may(&subject, "c1", Action::Admin).unwrap());
    }

    #[test]
    fn expired_permission_treated_as_absent() {
        let conn = open_test_db();
        let past = (OffsetDateTime::now_utc() - time::Duration::days(1)).unix_timestamp();
        insert_permission(&conn, "c1", "u1", "admin", Some(past));
        let authz = Authorizer::new(&conn);
        let subject = Subject::User("u1".into());
        assert!(!authz.may(&subject, "c1", Action::Read).unwrap());
    }

    #[test]
    fn future_expiry_still_valid() {
        let conn = open_test_db();
        let future = (OffsetDateTime::now_utc() + time::Duration::days(1)).unix_timestamp();
        insert_permission(&conn, "c1", "u1", "read", Some(future));
        let authz = Authorizer::new(&conn);
        let subject = Subject::User("u1".into());
        assert!(authz.may(&subject, "c1", Action::Read).unwrap());
    }
}
