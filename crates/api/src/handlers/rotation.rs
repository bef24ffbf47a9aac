use axum::Json;
use axum::extract::{Path, State};
use std::sync::Arc;

use crate::auth::AuthenticatedUser;
use crate::error::ApiResult;
use crate::models::{ApiResponse, RotationResponse, ScheduleRotationRequest};
use crate::server::AppState;

pub async fn rotate_cell_key(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(cell_id): Path<String>,
) -> ApiResult<Json<ApiResponse<RotationResponse>>> {
    let subject = claims.subject();
    let (old_version, new_version) = state.service.lock().await.rotate_cell_key(&subject, &cell_id)?;
    Ok(Json(ApiResponse::new(RotationResponse { old_version, new_version })))
}

pub async fn schedule_rotation(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(cell_id): Path<String>,
    Json(request): Json<ScheduleRotationRequest>,
) -> ApiResult<Json<ApiResponse<String>>> {
    let subject = claims.subject();
    state
        .service
        .lock()
        .await
        .schedule_rotation(&subject, &cell_id, request.interval_days)?;
    Ok(Json(ApiResponse::new(format!(
        "scheduled rotation every {} days",
        request.interval_days
    ))))
}
