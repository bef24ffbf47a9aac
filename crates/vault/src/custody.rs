//! Master key custody.
//!
//! The master key is process-level: it is supplied once at startup and held
//! in memory for the lifetime of the process. There is no local "locked"
//! state the way a single-user password manager has one; the original
//! system's `HSMIntegration` stubs (AWS/Azure/GCP providers never
//! implemented) are represented here only as the trait boundary a real HSM
//! custody backend would implement.

use crate::crypto::KeyMaterial;
use crate::error::VaultResult;

/// Abstracts where the master key comes from and how fresh data keys are
/// minted. A production deployment would back this with an HSM or KMS; the
/// in-memory implementation below is what this crate ships.
pub trait KeyCustody: Send + Sync {
    /// Returns the process master key.
    fn master_key_material(&self) -> &KeyMaterial;

    /// Generates a fresh random data key for a new cell.
    fn generate_data_key(&self) -> VaultResult<KeyMaterial> {
        KeyMaterial::random()
    }
}

/// Holds the master key directly in process memory. Suitable for
/// environments where the master key is injected via environment variable
/// or mounted secret file at startup.
pub struct InMemoryKeyCustody {
    master: KeyMaterial,
}

impl InMemoryKeyCustody {
    #[must_use]
    pub fn new(master: KeyMaterial) -> Self {
        Self { master }
    }

    /// Generates a new master key. Used when bootstrapping a fresh vault
    /// with no pre-existing master key to load.
    pub fn generate() -> VaultResult<Self> {
        Ok(Self {
            master: KeyMaterial::random()?,
        })
    }
}

impl KeyCustody for InMemoryKeyCustody {
    fn master_key_material(&self) -> &KeyMaterial {
        &self.master
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_data_key_produces_distinct_keys() {
        let custody = InMemoryKeyCustody::generate().unwrap();
        let a = custody.generate_data_key().unwrap();
        let b = custody.generate_data_key().unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }
}
