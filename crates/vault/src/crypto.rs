//! Per-cell envelope encryption.
//!
//! A `CellCipher` is instantiated from a 256-bit key and a cell id. It
//! derives a per-cell subkey via PBKDF2 and binds the cell id as AEAD
//! associated data on every encrypt/decrypt call, so a ciphertext produced
//! for one cell can never be decrypted under a cipher bound to another.
//!
//! Wire format for both secret ciphertext and wrapped keys is
//! `nonce(12) || ciphertext || tag(16)`, base64-encoded (standard, padded).

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use hmac::Hmac;
use pbkdf2::pbkdf2;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoErrorKind, VaultError, VaultResult};

const PBKDF2_ITERATIONS: u32 = 100_000;
const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// A raw 32-byte symmetric key. Zeroized on drop so a dropped `KeyMaterial`
/// never lingers in freed memory.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial(pub [u8; KEY_LEN]);

impl KeyMaterial {
    /// Generates a fresh random 32-byte key using the OS CSPRNG.
    pub fn random() -> VaultResult<Self> {
        let mut bytes = [0u8; KEY_LEN];
        getrandom::fill(&mut bytes).map_err(|_| VaultError::Crypto(CryptoErrorKind::Encrypt))?;
        Ok(Self(bytes))
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Hex-encodes the key material. Used only when wrapping a data key for
    /// storage; never logged.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> VaultResult<Self> {
        let bytes = hex::decode(s).map_err(|_| VaultError::Crypto(CryptoErrorKind::Decrypt))?;
        let arr: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| VaultError::Crypto(CryptoErrorKind::Decrypt))?;
        Ok(Self(arr))
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("KeyMaterial").field(&"<redacted>").finish()
    }
}

/// Derives a 32-byte subkey from `input_key` bound to `cell_id` via
/// PBKDF2-HMAC-SHA256, salted with the UTF-8 bytes of the cell id and run
/// for 100,000 iterations. Deterministic: the same (key, cell id) pair
/// always yields the same subkey.
pub fn derive_subkey(input_key: &KeyMaterial, cell_id: &str) -> KeyMaterial {
    let mut out = [0u8; KEY_LEN];
    pbkdf2::<Hmac<Sha256>>(&input_key.0, cell_id.as_bytes(), PBKDF2_ITERATIONS, &mut out)
        .expect("pbkdf2 output length is fixed and valid");
    KeyMaterial(out)
}

/// An AES-256-GCM cipher bound to a single (key, cell id) pair. The subkey
/// is derived once at construction and cached for the lifetime of this
/// instance only; it is never cached across instances. Every encrypt/decrypt
/// call binds the cell id as associated data, so a ciphertext or wrapped
/// key produced for one cell fails to decrypt under a cipher bound to any
/// other cell.
pub struct CellCipher {
    cipher: Aes256Gcm,
    cell_id: String,
}

impl CellCipher {
    #[must_use]
    pub fn new(key_material: &KeyMaterial, cell_id: &str) -> Self {
        let subkey = derive_subkey(key_material, cell_id);
        let key = Key::<Aes256Gcm>::from_slice(&subkey.0);
        Self {
            cipher: Aes256Gcm::new(key),
            cell_id: cell_id.to_string(),
        }
    }

    /// Encrypts `plaintext`, returning `base64(nonce || ciphertext || tag)`.
    pub fn encrypt(&self, plaintext: &[u8]) -> VaultResult<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        getrandom::fill(&mut nonce_bytes).map_err(|_| VaultError::Crypto(CryptoErrorKind::Encrypt))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext,
                    aad: self.cell_id.as_bytes(),
                },
            )
            .map_err(|_| VaultError::Crypto(CryptoErrorKind::Encrypt))?;

        let mut wire = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        wire.extend_from_slice(&nonce_bytes);
        wire.extend_from_slice(&ciphertext);
        Ok(B64.encode(wire))
    }

    /// Decrypts a `base64(nonce || ciphertext || tag)` string produced by
    /// [`CellCipher::encrypt`]. Inputs that decode to fewer than
    /// `nonce + tag` (28) bytes, or whose tag fails verification, are
    /// `VaultError::Crypto(CryptoErrorKind::Decrypt)`.
    pub fn decrypt(&self, wire_b64: &str) -> VaultResult<Vec<u8>> {
        let wire = B64
            .decode(wire_b64)
            .map_err(|_| VaultError::Crypto(CryptoErrorKind::Decrypt))?;
        if wire.len() < NONCE_LEN + TAG_LEN {
            return Err(VaultError::Crypto(CryptoErrorKind::Decrypt));
        }
        let (nonce_bytes, ciphertext) = wire.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher
            .decrypt(
                nonce,
                Payload {
                    msg: ciphertext,
                    aad: self.cell_id.as_bytes(),
                },
            )
            .map_err(|_| VaultError::Crypto(CryptoErrorKind::Decrypt))
    }
}

/// Wraps a cell's data key: instantiate `CellCipher(master, cell_id)` and
/// encrypt the hex encoding of the data key. The cell id binding is the
/// system's primary defense against a wrapped key being mis-routed to the
/// wrong cell.
pub fn wrap_data_key(master: &KeyMaterial, cell_id: &str, data_key: &KeyMaterial) -> VaultResult<String> {
    CellCipher::new(master, cell_id).encrypt(data_key.to_hex().as_bytes())
}

/// Inverse of [`wrap_data_key`].
pub fn unwrap_data_key(master: &KeyMaterial, cell_id: &str, wrapped: &str) -> VaultResult<KeyMaterial> {
    let plaintext = CellCipher::new(master, cell_id).decrypt(wrapped)?;
    let hex_str = String::from_utf8(plaintext).map_err(|_| VaultError::Crypto(CryptoErrorKind::Unwrap))?;
    KeyMaterial::from_hex(&hex_str)
}
