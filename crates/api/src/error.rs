//! API error envelope: wraps `VaultError` plus the handful of
//! transport-level failures (missing/invalid auth, malformed request) into
//! one stable JSON shape. Mirrors the core's own rule of a fixed `code`
//! string and no leaked internals.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use cellar_vault::VaultError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,
    #[error("access denied")]
    Forbidden,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Vault(err) => (vault_status(err), err.kind()),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal"),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

fn vault_status(err: &VaultError) -> StatusCode {
    match err {
        VaultError::NotFound | VaultError::KeyNotFound | VaultError::VersionNotFound => StatusCode::NOT_FOUND,
        VaultError::AlreadyExists | VaultError::Conflict => StatusCode::CONFLICT,
        VaultError::Forbidden => StatusCode::FORBIDDEN,
        VaultError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        VaultError::Timeout => StatusCode::REQUEST_TIMEOUT,
        VaultError::NoActiveKey | VaultError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        VaultError::Crypto(_) | VaultError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
