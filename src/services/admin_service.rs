use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, LoaderTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::{AuditEntry, log_audit_best_effort},
    dto::{
        admin::{AuditLogList, AuditLogQuery, UserList},
        orders::{OrderList, OrderWithItems, UpdateOrderStatusRequest},
    },
    entity::{
        Roles, UserRoles,
        audit_logs::{Column as AuditCol, Entity as AuditLogs},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_superadmin},
    models::{AuditLog, Order, OrderStatus, User},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, Paged, Pagination, SortOrder},
    services::order_service::load_items,
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        let status = status.parse::<OrderStatus>()?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let mut finder = Orders::find().filter(condition);

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items: orders }, Some(meta)))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;

    let items = load_items(&state.orm, order.id).await?;

    let data = OrderWithItems {
        order: Order::from(order),
        items,
    };
    Ok(ApiResponse::success("Order found", data, Some(Meta::empty())))
}

/// Overwrite an order's status. Any value in the vocabulary is accepted from any state.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let existing = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    let old_status = existing.status.clone();

    let mut active: OrderActive = existing.into();
    active.status = Set(payload.status.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    tracing::info!(order_id = %order.id, from = %old_status, to = %order.status, "order status overwritten");

    log_audit_best_effort(
        &state.pool,
        AuditEntry::new(Some(user.user_id), "order_status_update", format!("order:{}", order.id))
            .old_value(json!({ "status": old_status }))
            .new_value(json!({ "status": order.status })),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        Order::from(order),
        Some(Meta::empty()),
    ))
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    ensure_superadmin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Users::find().order_by_desc(UserCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let users = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let roles = users.load_many_to_many(Roles, UserRoles, &state.orm).await?;

    let items = users
        .into_iter()
        .zip(roles)
        .map(|(u, r)| User::from_entity(u, r))
        .collect();

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Hard delete. Vendor, product, cart and order rows go with the user through FK cascades.
pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_superadmin(user)?;
    if id == user.user_id {
        return Err(AppError::BadRequest("Cannot delete your own account".into()));
    }

    let target = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    let email = target.email.clone();
    target.delete(&state.orm).await?;

    tracing::info!(user_id = %id, actor_id = %user.user_id, "user deleted");

    log_audit_best_effort(
        &state.pool,
        AuditEntry::new(Some(user.user_id), "user_delete", format!("user:{id}"))
            .old_value(json!({ "email": email })),
    )
    .await;

    Ok(ApiResponse::success(
        "User deleted",
        json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_audit_logs(
    state: &AppState,
    user: &AuthUser,
    query: AuditLogQuery,
) -> AppResult<ApiResponse<AuditLogList>> {
    ensure_superadmin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(action) = query.action.as_deref().filter(|s| !s.is_empty()) {
        condition = condition.add(AuditCol::Action.eq(action));
    }
    if let Some(actor_id) = query.actor_id {
        condition = condition.add(AuditCol::ActorId.eq(actor_id));
    }

    let finder = AuditLogs::find()
        .filter(condition)
        .order_by_desc(AuditCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(AuditLog::from)
        .collect();

    Ok(ApiResponse::success(
        "Audit logs",
        AuditLogList { items },
        Some(Meta::new(page, limit, total)),
    ))
}
