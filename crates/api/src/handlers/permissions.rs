use axum::Json;
use axum::extract::{Path, State};
use std::sync::Arc;

use cellar_vault::Grant;

use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, ApiResult};
use crate::models::{ApiResponse, GrantPermissionRequest};
use crate::server::AppState;

pub async fn grant_permission(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(cell_id): Path<String>,
    Json(request): Json<GrantPermissionRequest>,
) -> ApiResult<Json<ApiResponse<String>>> {
    let grant = Grant::parse(&request.grant)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown grant '{}'", request.grant)))?;
    let subject = claims.subject();
    state
        .service
        .lock()
        .await
        .grant_permission(&subject, &cell_id, &request.user_id, grant, request.expires_at)?;
    Ok(Json(ApiResponse::new(format!(
        "granted {} to {}",
        request.grant, request.user_id
    ))))
}

pub async fn revoke_permission(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((cell_id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<ApiResponse<String>>> {
    let subject = claims.subject();
    state.service.lock().await.revoke_permission(&subject, &cell_id, &user_id)?;
    Ok(Json(ApiResponse::new(format!("revoked permission for {user_id}"))))
}
