use thiserror::Error;

/// Sub-kind of a [`VaultError::Crypto`] failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoErrorKind {
    Wrap,
    Unwrap,
    Encrypt,
    Decrypt,
}

impl std::fmt::Display for CryptoErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CryptoErrorKind::Wrap => "wrap",
            CryptoErrorKind::Unwrap => "unwrap",
            CryptoErrorKind::Encrypt => "encrypt",
            CryptoErrorKind::Decrypt => "decrypt",
        };
        f.write_str(s)
    }
}

/// The finite error taxonomy the core is allowed to return. Every variant
/// maps to a stable `kind()` string at the RPC boundary; none of them
/// carry cryptographic internals or stack traces.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("resource not found")]
    NotFound,

    #[error("resource already exists")]
    AlreadyExists,

    #[error("forbidden")]
    Forbidden,

    #[error("cell has no active key")]
    NoActiveKey,

    #[error("key version not found")]
    KeyNotFound,

    #[error("secret version not found")]
    VersionNotFound,

    #[error("cryptographic {0} failed")]
    Crypto(CryptoErrorKind),

    #[error("payload exceeds the maximum allowed size")]
    PayloadTooLarge,

    #[error("conflicting concurrent write")]
    Conflict,

    #[error("operation timed out")]
    Timeout,

    #[error("persistence unavailable")]
    Unavailable,

    #[error("internal error: {0}")]
    Internal(String),
}

impl VaultError {
    /// Stable wire identifier for this error kind. Never includes message
    /// text that could leak internals.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            VaultError::NotFound => "NotFound",
            VaultError::AlreadyExists => "AlreadyExists",
            VaultError::Forbidden => "Forbidden",
            VaultError::NoActiveKey => "NoActiveKey",
            VaultError::KeyNotFound => "KeyNotFound",
            VaultError::VersionNotFound => "VersionNotFound",
            VaultError::Crypto(_) => "CryptoError",
            VaultError::PayloadTooLarge => "PayloadTooLarge",
            VaultError::Conflict => "Conflict",
            VaultError::Timeout => "Timeout",
            VaultError::Unavailable => "Unavailable",
            VaultError::Internal(_) => "Internal",
        }
    }
}

impl From<rusqlite::Error> for VaultError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref sqlite_err, _) = err {
            if sqlite_err.extended_code == 2067 || sqlite_err.code == rusqlite::ErrorCode::ConstraintViolation {
                return VaultError::Conflict;
            }
            if sqlite_err.code == rusqlite::ErrorCode::DatabaseBusy {
                return VaultError::Timeout;
            }
        }
        VaultError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        VaultError::Internal(err.to_string())
    }
}

pub type VaultResult<T> = Result<T, VaultError>;
