use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthData {
    pub status: String,
    pub database: Option<String>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Process is up", body = ApiResponse<HealthData>),
    ),
    tag = "Health"
)]
pub async fn health_check() -> Json<ApiResponse<HealthData>> {
    let data = HealthData {
        status: "ok".to_string(),
        database: None,
    };

    Json(ApiResponse::success("Health check", data, Some(Meta::empty())))
}

#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "Database reachable", body = ApiResponse<HealthData>),
        (status = 503, description = "Database unreachable", body = ApiResponse<HealthData>),
    ),
    tag = "Health"
)]
pub async fn readiness(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<HealthData>>) {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => {
            let data = HealthData {
                status: "ok".into(),
                database: Some("up".into()),
            };
            (
                StatusCode::OK,
                Json(ApiResponse::success("Ready", data, Some(Meta::empty()))),
            )
        }
        Err(err) => {
            tracing::warn!(error = %err, "readiness probe failed");
            let data = HealthData {
                status: "degraded".into(),
                database: Some("down".into()),
            };
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::failure("Database unavailable", data)),
            )
        }
    }
}
