use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{AuditLogList, AuditLogQuery, UserList},
        orders::{OrderList, OrderWithItems},
        vendors::{VendorList, VendorListQuery, VendorStatusChange},
    },
    error::AppResult,
    middleware::auth::{AuthUser, ensure_superadmin},
    models::Vendor,
    response::ApiResponse,
    routes::params::{OrderListQuery, Pagination},
    services::{admin_service, vendor_service::VendorLifecycle},
    state::AppState,
};

/// Order oversight for `admin` and `superadmin`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_all_orders))
        .route("/orders/{id}", get(get_order_admin))
}

/// Vendor review, user management and audit access, `superadmin` only.
pub fn super_admin_router() -> Router<AppState> {
    Router::new()
        .route("/vendors", get(list_vendors))
        .route("/vendors/{id}", get(get_vendor))
        .route("/vendors/{id}/approve", put(approve_vendor))
        .route("/vendors/{id}/reject", put(reject_vendor))
        .route("/vendors/{id}/suspend", put(suspend_vendor))
        .route("/users", get(list_users))
        .route("/users/{id}", delete(delete_user))
        .route("/audit-logs", get(list_audit_logs))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
    (status = 200, description = "Get all orders (admin only)", body = ApiResponse<OrderList>),
    (status = 403, description = "Forbidden"),
    (status = 500, description = "Internal Server Error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = admin_service::list_all_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
    (status = 200, description = "Get any order with items (admin only)", body = ApiResponse<OrderWithItems>),
    (status = 404, description = "Not Found"),
    (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = admin_service::get_order_admin(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/super-admin/vendors",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "pending, active, rejected, suspended")
    ),
    responses(
        (status = 200, description = "Vendors", body = ApiResponse<VendorList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Super Admin"
)]
pub async fn list_vendors(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<VendorListQuery>,
) -> AppResult<Json<ApiResponse<VendorList>>> {
    ensure_superadmin(&user)?;
    let resp = VendorLifecycle::from_state(&state).list(query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/super-admin/vendors/{id}",
    params(
        ("id" = Uuid, Path, description = "Vendor ID")
    ),
    responses(
        (status = 200, description = "Vendor", body = ApiResponse<Vendor>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Vendor not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Super Admin"
)]
pub async fn get_vendor(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vendor>>> {
    ensure_superadmin(&user)?;
    let resp = VendorLifecycle::from_state(&state).get(id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/super-admin/vendors/{id}/approve",
    params(
        ("id" = Uuid, Path, description = "Vendor ID")
    ),
    responses(
        (status = 200, description = "Vendor active, owner granted admin", body = ApiResponse<VendorStatusChange>),
        (status = 404, description = "Vendor not found"),
        (status = 409, description = "Vendor already active"),
    ),
    security(("bearer_auth" = [])),
    tag = "Super Admin"
)]
pub async fn approve_vendor(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<VendorStatusChange>>> {
    ensure_superadmin(&user)?;
    let resp = VendorLifecycle::from_state(&state).approve(Some(&user), id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/super-admin/vendors/{id}/reject",
    params(
        ("id" = Uuid, Path, description = "Vendor ID")
    ),
    responses(
        (status = 200, description = "Vendor rejected, admin revoked", body = ApiResponse<VendorStatusChange>),
        (status = 404, description = "Vendor not found"),
        (status = 409, description = "Vendor already rejected"),
    ),
    security(("bearer_auth" = [])),
    tag = "Super Admin"
)]
pub async fn reject_vendor(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<VendorStatusChange>>> {
    ensure_superadmin(&user)?;
    let resp = VendorLifecycle::from_state(&state).reject(Some(&user), id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/super-admin/vendors/{id}/suspend",
    params(
        ("id" = Uuid, Path, description = "Vendor ID")
    ),
    responses(
        (status = 200, description = "Vendor suspended, admin revoked", body = ApiResponse<VendorStatusChange>),
        (status = 404, description = "Vendor not found"),
        (status = 409, description = "Vendor already suspended"),
    ),
    security(("bearer_auth" = [])),
    tag = "Super Admin"
)]
pub async fn suspend_vendor(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<VendorStatusChange>>> {
    ensure_superadmin(&user)?;
    let resp = VendorLifecycle::from_state(&state).suspend(Some(&user), id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/super-admin/users",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "Users with their roles", body = ApiResponse<UserList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Super Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = admin_service::list_users(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/super-admin/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User and owned rows deleted", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Super Admin"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = admin_service::delete_user(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/super-admin/audit-logs",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("action" = Option<String>, Query, description = "Filter by action"),
        ("actor_id" = Option<Uuid>, Query, description = "Filter by actor")
    ),
    responses(
        (status = 200, description = "Audit log entries, newest first", body = ApiResponse<AuditLogList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Super Admin"
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AuditLogQuery>,
) -> AppResult<Json<ApiResponse<AuditLogList>>> {
    let resp = admin_service::list_audit_logs(&state, &user, query).await?;
    Ok(Json(resp))
}
