use axum::Json;
use axum::extract::{Path, Query, State};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;

use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, ApiResult};
use crate::models::{ApiResponse, PutSecretRequest, SecretQuery, SecretResponse, SecretValueResponse};
use crate::server::AppState;

fn decode_value(value: &str) -> ApiResult<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| ApiError::BadRequest(format!("value is not valid base64: {e}")))
}

pub async fn create_secret(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((cell_id, key)): Path<(String, String)>,
    Json(request): Json<PutSecretRequest>,
) -> ApiResult<Json<ApiResponse<SecretResponse>>> {
    let plaintext = decode_value(&request.value)?;
    let subject = claims.subject();
    let secret = state
        .service
        .lock()
        .await
        .create_secret(&subject, &cell_id, &key, &plaintext, request.metadata)?;
    Ok(Json(ApiResponse::new(secret.into())))
}

pub async fn update_secret(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((cell_id, key)): Path<(String, String)>,
    Json(request): Json<PutSecretRequest>,
) -> ApiResult<Json<ApiResponse<SecretResponse>>> {
    let plaintext = decode_value(&request.value)?;
    let subject = claims.subject();
    let secret = state.service.lock().await.update_secret(
        &subject,
        &cell_id,
        &key,
        &plaintext,
        Some(request.metadata),
    )?;
    Ok(Json(ApiResponse::new(secret.into())))
}

pub async fn read_secret(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((cell_id, key)): Path<(String, String)>,
    Query(query): Query<SecretQuery>,
) -> ApiResult<Json<ApiResponse<SecretValueResponse>>> {
    let subject = claims.subject();
    let plaintext = state
        .service
        .lock()
        .await
        .read_secret(&subject, &cell_id, &key, query.version)?;
    Ok(Json(ApiResponse::new(SecretValueResponse {
        key,
        version: query.version,
        value: STANDARD.encode(plaintext),
    })))
}

pub async fn delete_secret(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((cell_id, key)): Path<(String, String)>,
) -> ApiResult<Json<ApiResponse<String>>> {
    let subject = claims.subject();
    state.service.lock().await.delete_secret(&subject, &cell_id, &key)?;
    Ok(Json(ApiResponse::new(format!("deleted secret {cell_id}/{key}"))))
}
