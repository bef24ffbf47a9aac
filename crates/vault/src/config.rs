use std::time::Duration;

/// Core configuration, loaded with defaults and overridable via environment
/// variables. There is no config file: the core is embedded by the api
/// crate (or tests), which owns process-wide configuration concerns.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Default rotation interval applied to a cell that has no explicit
    /// rotation schedule.
    pub default_rotation_days: u32,

    /// Maximum size, in bytes, of a secret's plaintext payload.
    pub max_secret_bytes: usize,

    /// Maximum number of secrets a single cell may hold.
    pub max_secrets_per_cell: usize,

    /// Per-operation timeout applied by callers wrapping core calls.
    pub operation_timeout: Duration,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            default_rotation_days: 30,
            max_secret_bytes: 1_048_576,
            max_secrets_per_cell: 1_000,
            operation_timeout: Duration::from_secs(30),
        }
    }
}

impl VaultConfig {
    /// Builds configuration from defaults overridden by environment
    /// variables, mirroring the knobs the original system exposed via its
    /// settings file: `VAULT_ROTATION_DEFAULT_DAYS`, `VAULT_MAX_SECRET_BYTES`,
    /// `VAULT_MAX_SECRETS_PER_CELL`, `VAULT_OPERATION_TIMEOUT_SECS`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("VAULT_ROTATION_DEFAULT_DAYS") {
            if let Ok(parsed) = v.parse() {
                cfg.default_rotation_days = parsed;
            }
        }
        if let Ok(v) = std::env::var("VAULT_MAX_SECRET_BYTES") {
            if let Ok(parsed) = v.parse() {
                cfg.max_secret_bytes = parsed;
            }
        }
        if let Ok(v) = std::env::var("VAULT_MAX_SECRETS_PER_CELL") {
            if let Ok(parsed) = v.parse() {
                cfg.max_secrets_per_cell = parsed;
            }
        }
        if let Ok(v) = std::env::var("VAULT_OPERATION_TIMEOUT_SECS") {
            if let Ok(parsed) = v.parse::<u64>() {
                cfg.operation_timeout = Duration::from_secs(parsed);
            }
        }

        cfg
    }
}
