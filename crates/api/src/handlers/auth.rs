use axum::Json;
use axum::extract::State;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

use crate::error::ApiResult;
use crate::models::{ApiResponse, LoginRequest, LoginResponse};
use crate::server::AppState;

/// Issues a bearer token for `user_id`. There is no password check here —
/// unlike a single-user local vault, authentication of the caller identity
/// is expected to happen upstream (an SSO gateway, a service mesh); this
/// endpoint only mints the token the rest of the API trusts.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<ApiResponse<LoginResponse>>> {
    let token = state.auth.generate_token(&request.user_id, request.superuser)?;
    let expires_at = OffsetDateTime::now_utc() + Duration::hours(1);
    Ok(Json(ApiResponse::new(LoginResponse { token, expires_at })))
}
