use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::vendors::VendorApplyRequest,
    error::AppResult,
    middleware::auth::AuthUser,
    models::Vendor,
    response::ApiResponse,
    services::vendor_service::VendorLifecycle,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/apply", post(apply))
}

#[utoipa::path(
    post,
    path = "/api/vendors/apply",
    request_body = VendorApplyRequest,
    responses(
        (status = 200, description = "Application stored as pending", body = ApiResponse<Vendor>),
        (status = 409, description = "Already applied"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendors"
)]
pub async fn apply(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<VendorApplyRequest>,
) -> AppResult<Json<ApiResponse<Vendor>>> {
    let resp = VendorLifecycle::from_state(&state).apply(&user, payload).await?;
    Ok(Json(resp))
}
