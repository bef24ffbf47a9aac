use axum::Json;
use axum::extract::{Path, State};
use std::sync::Arc;

use cellar_vault::AuditRecord;

use crate::auth::AuthenticatedUser;
use crate::error::ApiResult;
use crate::models::ApiResponse;
use crate::server::AppState;

pub async fn list_audit(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(cell_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<AuditRecord>>>> {
    let subject = claims.subject();
    let records = state.service.lock().await.list_audit(&subject, &cell_id)?;
    Ok(Json(ApiResponse::new(records)))
}
