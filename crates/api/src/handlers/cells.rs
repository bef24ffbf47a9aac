use axum::Json;
use axum::extract::{Path, State};
use std::sync::Arc;

use crate::auth::AuthenticatedUser;
use crate::error::ApiResult;
use crate::models::{ApiResponse, CellResponse, CreateCellRequest, UpdateCellRequest};
use crate::server::AppState;

pub async fn create_cell(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateCellRequest>,
) -> ApiResult<Json<ApiResponse<CellResponse>>> {
    let subject = claims.subject();
    let cell = state.service.lock().await.create_cell(
        &subject,
        &request.name,
        request.description.as_deref(),
        request.rotation_period_days,
        request.metadata,
    )?;
    Ok(Json(ApiResponse::new(cell.into())))
}

pub async fn list_cells(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<Vec<CellResponse>>>> {
    let cells = state.service.lock().await.list_cells()?;
    Ok(Json(ApiResponse::new(cells.into_iter().map(Into::into).collect())))
}

pub async fn get_cell(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(cell_id): Path<String>,
) -> ApiResult<Json<ApiResponse<CellResponse>>> {
    let cell = state.service.lock().await.get_cell(&cell_id)?;
    Ok(Json(ApiResponse::new(cell.into())))
}

pub async fn update_cell(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(cell_id): Path<String>,
    Json(request): Json<UpdateCellRequest>,
) -> ApiResult<Json<ApiResponse<CellResponse>>> {
    let subject = claims.subject();
    let cell = state.service.lock().await.update_cell(
        &subject,
        &cell_id,
        request.description.as_deref(),
        request.rotation_period_days,
        request.metadata,
    )?;
    Ok(Json(ApiResponse::new(cell.into())))
}

pub async fn delete_cell(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(cell_id): Path<String>,
) -> ApiResult<Json<ApiResponse<String>>> {
    let subject = claims.subject();
    state.service.lock().await.delete_cell(&subject, &cell_id)?;
    Ok(Json(ApiResponse::new(format!("deleted cell {cell_id}"))))
}
