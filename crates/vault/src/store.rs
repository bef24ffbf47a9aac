//! `SecretStore`: versioned secret records, encrypted at rest under the
//! cell's active data key.

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value as Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::crypto::{KeyMaterial, unwrap_data_key};
use crate::custody::KeyCustody;
use crate::error::{VaultError, VaultResult};
use crate::model::{Secret, SecretVersion};
use crate::registry::KeyRegistry;

/// Plaintext bound used by this module's own tests; matches
/// `VaultConfig::default().max_secret_bytes`.
#[cfg(test)]
pub const DEFAULT_MAX_SECRET_BYTES: usize = 1024 * 1024;

pub struct SecretStore<'a> {
    conn: &'a Connection,
    custody: &'a dyn KeyCustody,
    max_secret_bytes: usize,
}

impl<'a> SecretStore<'a> {
    #[must_use]
    pub fn new(conn: &'a Connection, custody: &'a dyn KeyCustody, max_secret_bytes: usize) -> Self {
        Self {
            conn,
            custody,
            max_secret_bytes,
        }
    }

    fn check_bound(&self, plaintext: &[u8]) -> VaultResult<()> {
        if plaintext.len() > self.max_secret_bytes {
            return Err(VaultError::PayloadTooLarge);
        }
        Ok(())
    }

    fn active_cipher_for(&self, cell_id: &str) -> VaultResult<(crate::crypto::CellCipher, u32)> {
        let registry = KeyRegistry::new(self.conn);
        let active = registry.active_key(cell_id)?;
        let data_key = unwrap_data_key(self.custody.master_key_material(), cell_id, &active.wrapped_key)?;
        Ok((crate::crypto::CellCipher::new(&data_key, cell_id), active.version))
    }

    /// Fails `AlreadyExists` if `(cell_id, key)` exists. Encrypts
    /// `plaintext` under the cell's active data key and persists `Secret`
    /// and `SecretVersion` (version 1) atomically.
    pub fn create(&self, cell_id: &str, key: &str, plaintext: &[u8], metadata: Json) -> VaultResult<Secret> {
        self.check_bound(plaintext)?;

        let exists: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM secrets WHERE cell_id = ?1 AND key = ?2",
                params![cell_id, key],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(VaultError::AlreadyExists);
        }

        let (cipher, cell_key_version) = self.active_cipher_for(cell_id)?;
        let ciphertext = cipher.encrypt(plaintext)?;

        let now = OffsetDateTime::now_utc();
        let secret_id = Uuid::new_v4().to_string();
        let metadata_str = metadata.to_string();

        self.conn.execute(
            "INSERT INTO secrets (id, cell_id, key, ciphertext, version, created_at, updated_at, metadata) \
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5, ?6)",
            params![secret_id, cell_id, key, ciphertext, now.unix_timestamp(), metadata_str],
        )?;

        self.conn.execute(
            "INSERT INTO secret_versions (id, secret_id, ciphertext, version, cell_key_version, created_at) \
             VALUES (?1, ?2, ?3, 1, ?4, ?5)",
            params![
                Uuid::new_v4().to_string(),
                secret_id,
                ciphertext,
                cell_key_version,
                now.unix_timestamp(),
            ],
        )?;

        Ok(Secret {
            id: secret_id,
            cell_id: cell_id.to_string(),
            key: key.to_string(),
            current_ciphertext: ciphertext,
            current_version: 1,
            metadata,
            created_at: now,
            updated_at: now,
        })
    }

    /// Fails `NotFound` if `(cell_id, key)` is absent. Encrypts under the
    /// active data key, increments `current_version`, and appends a new
    /// `SecretVersion`, atomically with the `Secret` row update.
    pub fn update(&self, cell_id: &str, key: &str, plaintext: &[u8], metadata: Option<Json>) -> VaultResult<Secret> {
        self.check_bound(plaintext)?;

        let (secret_id, current_version, existing_metadata): (String, i64, String) = self
            .conn
            .query_row(
                "SELECT id, version, metadata FROM secrets WHERE cell_id = ?1 AND key = ?2",
                params![cell_id, key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?
            .ok_or(VaultError::NotFound)?;

        let (cipher, cell_key_version) = self.active_cipher_for(cell_id)?;
        let ciphertext = cipher.encrypt(plaintext)?;
        let new_version = current_version + 1;
        let now = OffsetDateTime::now_utc();

        let metadata_value = metadata.unwrap_or_else(|| {
            serde_json::from_str(&existing_metadata).unwrap_or(Json::Null)
        });
        let metadata_str = metadata_value.to_string();

        self.conn.execute(
            "UPDATE secrets SET ciphertext = ?1, version = ?2, updated_at = ?3, metadata = ?4 \
             WHERE id = ?5",
            params![ciphertext, new_version, now.unix_timestamp(), metadata_str, secret_id],
        )?;

        self.conn.execute(
            "INSERT INTO secret_versions (id, secret_id, ciphertext, version, cell_key_version, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                Uuid::new_v4().to_string(),
                secret_id,
                ciphertext,
                new_version,
                cell_key_version,
                now.unix_timestamp(),
            ],
        )?;

        Ok(Secret {
            id: secret_id,
            cell_id: cell_id.to_string(),
            key: key.to_string(),
            current_ciphertext: ciphertext,
            current_version: new_version as u32,
            metadata: metadata_value,
            created_at: now,
            updated_at: now,
        })
    }

    /// With no `version`, returns the current plaintext. With a `version`,
    /// decrypts the `SecretVersion` row using the `CellKey` version that
    /// was active **at the time that version was written** — not
    /// necessarily the cell's currently active key — so reads of historical
    /// versions keep working across any number of subsequent rotations.
    pub fn read(&self, cell_id: &str, key: &str, version: Option<u32>) -> VaultResult<Vec<u8>> {
        let secret_id: String = self
            .conn
            .query_row(
                "SELECT id FROM secrets WHERE cell_id = ?1 AND key = ?2",
                params![cell_id, key],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(VaultError::NotFound)?;

        // For a current read we don't know the cell key version yet: the
        // `secrets` row only tracks the secret's own version number, so we
        // resolve the matching `secret_versions` row afterward. A
        // historical read already gets the cell key version directly.
        let (ciphertext, cell_key_version): (String, i64) = match version {
            None => {
                let (ct, secret_version): (String, i64) = self.conn.query_row(
                    "SELECT ciphertext, version FROM secrets WHERE id = ?1",
                    params![secret_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                let key_version = self.current_secret_key_version(&secret_id, secret_version as u32)?;
                (ct, i64::from(key_version))
            }
            Some(v) => {
                let row: Option<(String, i64)> = self
                    .conn
                    .query_row(
                        "SELECT ciphertext, cell_key_version FROM secret_versions \
                         WHERE secret_id = ?1 AND version = ?2",
                        params![secret_id, v],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                row.ok_or(VaultError::VersionNotFound)?
            }
        };
        let cell_key_version = cell_key_version as u32;

        let registry = KeyRegistry::new(self.conn);
        let wrapped = registry.key_at_version(cell_id, cell_key_version)?;
        let data_key: KeyMaterial =
            unwrap_data_key(self.custody.master_key_material(), cell_id, &wrapped.wrapped_key)?;
        let cipher = crate::crypto::CellCipher::new(&data_key, cell_id);
        cipher.decrypt(&ciphertext)
    }

    /// For a "current" read, `secrets.version` doubles as the secret's
    /// version number, not the cell key version; look the real cell key
    /// version up from the matching `secret_versions` row.
    fn current_secret_key_version(&self, secret_id: &str, secret_version: u32) -> VaultResult<u32> {
        let v: i64 = self.conn.query_row(
            "SELECT cell_key_version FROM secret_versions WHERE secret_id = ?1 AND version = ?2",
            params![secret_id, secret_version],
            |row| row.get(0),
        )?;
        Ok(v as u32)
    }

    /// Removes the `Secret` and all its `SecretVersion` rows atomically
    /// (the `ON DELETE CASCADE` foreign key does the version cleanup).
    /// Fails `NotFound` if absent; a second call also fails `NotFound`.
    pub fn delete(&self, cell_id: &str, key: &str) -> VaultResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM secrets WHERE cell_id = ?1 AND key = ?2", params![cell_id, key])?;
        if changed == 0 {
            return Err(VaultError::NotFound);
        }
        Ok(())
    }
}

/// Reconstructs a domain [`SecretVersion`] row; used by tests and by the
/// api crate to list version history.
pub fn load_secret_version(conn: &Connection, secret_id: &str, version: u32) -> VaultResult<SecretVersion> {
    conn.query_row(
        "SELECT id, secret_id, version, ciphertext, cell_key_version, created_at \
         FROM secret_versions WHERE secret_id = ?1 AND version = ?2",
        params![secret_id, version],
        |row| {
            let created_at: i64 = row.get(5)?;
            Ok(SecretVersion {
                id: row.get(0)?,
                secret_id: row.get(1)?,
                version: row.get::<_, i64>(2)? as u32,
                ciphertext: row.get(3)?,
                cell_key_version: row.get::<_, i64>(4)? as u32,
                created_at: OffsetDateTime::from_unix_timestamp(created_at).unwrap_or(OffsetDateTime::UNIX_EPOCH),
            })
        },
    )
    .optional()?
    .ok_or(VaultError::VersionNotFound)
}
