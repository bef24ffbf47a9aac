use axum::Json;

use crate::models::{ApiResponse, HealthResponse};

pub async fn health() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::new(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}
