//! Request/response DTOs for the HTTP surface. Plaintext secret values
//! cross this boundary base64-encoded; the core never sees or returns raw
//! JSON strings as key material.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use time::OffsetDateTime;

use cellar_vault::{Cell, Secret};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub const fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user_id: String,
    #[serde(default)]
    pub superuser: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

const fn default_rotation_period_days() -> u32 {
    30
}

#[derive(Debug, Deserialize)]
pub struct CreateCellRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_rotation_period_days")]
    pub rotation_period_days: u32,
    #[serde(default)]
    pub metadata: Json,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCellRequest {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rotation_period_days: Option<u32>,
    #[serde(default)]
    pub metadata: Option<Json>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CellResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub rotation_period_days: u32,
    pub metadata: Json,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<Cell> for CellResponse {
    fn from(cell: Cell) -> Self {
        Self {
            id: cell.id,
            name: cell.name,
            description: cell.description,
            rotation_period_days: cell.rotation_period_days,
            metadata: cell.metadata,
            created_at: cell.created_at,
            updated_at: cell.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PutSecretRequest {
    /// Base64-encoded plaintext.
    pub value: String,
    #[serde(default)]
    pub metadata: Json,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SecretResponse {
    pub cell_id: String,
    pub key: String,
    pub current_version: u32,
    pub metadata: Json,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<Secret> for SecretResponse {
    fn from(secret: Secret) -> Self {
        Self {
            cell_id: secret.cell_id,
            key: secret.key,
            current_version: secret.current_version,
            metadata: secret.metadata,
            created_at: secret.created_at,
            updated_at: secret.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SecretQuery {
    pub version: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SecretValueResponse {
    pub key: String,
    pub version: Option<u32>,
    /// Base64-encoded plaintext.
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct GrantPermissionRequest {
    pub user_id: String,
    pub grant: String,
    #[serde(default)]
    pub expires_at: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRotationRequest {
    pub interval_days: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RotationResponse {
    pub old_version: u32,
    pub new_version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
