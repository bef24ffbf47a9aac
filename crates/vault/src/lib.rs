pub mod audit;
pub mod authz;
pub mod cell;
pub mod config;
pub mod crypto;
pub mod custody;
pub mod db;
pub mod error;
pub mod model;
pub mod registry;
pub mod rotation;
pub mod service;
pub mod store;

pub use audit::AuditSink;
pub use authz::Authorizer;
pub use cell::CellRepository;
pub use config::VaultConfig;
pub use crypto::{CellCipher, KeyMaterial, derive_subkey, unwrap_data_key, wrap_data_key};
pub use custody::{InMemoryKeyCustody, KeyCustody};
pub use db::Db;
pub use error::{CryptoErrorKind, VaultError, VaultResult};
pub use model::{
    Action, AuditRecord, Cell, CellKeyRecord, CellPermission, Grant, NewAuditRecord, RotationSchedule, Secret,
    SecretVersion, Subject,
};
pub use registry::KeyRegistry;
pub use rotation::RotationEngine;
pub use service::VaultService;
pub use store::SecretStore;
