use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait, sea_query::OnConflict,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::{AuditEntry, log_audit_best_effort},
    dto::wishlist::{
        AddWishlistRequest, UpdateWishlistItemRequest, WishlistImport, WishlistItemDto,
        WishlistView,
    },
    entity::{
        products::{Column as ProdCol, Entity as Products},
        wishlist_items::{self, ActiveModel as WishlistActive, Column as WishCol, Entity as WishlistItems},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Product, ProductStatus},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_wishlist(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<WishlistView>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = WishlistItems::find()
        .filter(WishCol::UserId.eq(user.user_id))
        .order_by_desc(WishCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let rows = finder
        .find_also_related(Products)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = rows
        .into_iter()
        .filter_map(|(item, product)| product.map(|p| to_dto(item, p.into())))
        .collect();

    Ok(ApiResponse::success(
        "OK",
        WishlistView { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Adding a product already on the list returns the existing entry.
pub async fn add_to_wishlist(
    state: &AppState,
    user: &AuthUser,
    payload: AddWishlistRequest,
) -> AppResult<ApiResponse<WishlistItemDto>> {
    let product = Products::find_by_id(payload.product_id)
        .filter(ProdCol::Status.eq(ProductStatus::Active.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Product not found".into()))?;

    let existing = WishlistItems::find()
        .filter(WishCol::UserId.eq(user.user_id))
        .filter(WishCol::ProductId.eq(product.id))
        .one(&state.orm)
        .await?;

    let item = match existing {
        Some(item) => item,
        None => {
            let item = WishlistActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                product_id: Set(product.id),
                created_at: Set(Utc::now().into()),
            }
            .insert(&state.orm)
            .await?;

            log_audit_best_effort(
                &state.pool,
                AuditEntry::new(Some(user.user_id), "wishlist_add", format!("product:{}", product.id)),
            )
            .await;
            item
        }
    };

    Ok(ApiResponse::success(
        "Added to wishlist",
        to_dto(item, Product::from(product)),
        Some(Meta::empty()),
    ))
}

/// Point an existing entry at a different product. Only the entry's owner may move it.
pub async fn update_wishlist_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateWishlistItemRequest,
) -> AppResult<ApiResponse<WishlistItemDto>> {
    let item = WishlistItems::find_by_id(item_id)
        .filter(WishCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Wishlist item"))?;

    let product = Products::find_by_id(payload.product_id)
        .filter(ProdCol::Status.eq(ProductStatus::Active.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Product not found".into()))?;

    if item.product_id == product.id {
        return Ok(ApiResponse::success(
            "Wishlist item updated",
            to_dto(item, Product::from(product)),
            Some(Meta::empty()),
        ));
    }

    let taken = WishlistItems::find()
        .filter(WishCol::UserId.eq(user.user_id))
        .filter(WishCol::ProductId.eq(product.id))
        .one(&state.orm)
        .await?;
    if taken.is_some() {
        return Err(AppError::Conflict("Product is already in wishlist".into()));
    }

    let previous = item.product_id;
    let mut active: WishlistActive = item.into();
    active.product_id = Set(product.id);
    let item = active.update(&state.orm).await?;

    log_audit_best_effort(
        &state.pool,
        AuditEntry::new(Some(user.user_id), "wishlist_update", format!("wishlist_item:{}", item.id))
            .old_value(json!({ "product_id": previous }))
            .new_value(json!({ "product_id": product.id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Wishlist item updated",
        to_dto(item, Product::from(product)),
        Some(Meta::empty()),
    ))
}

/// Bulk-add entries in one transaction. Unknown products and ones already listed are skipped.
pub async fn import_wishlist(
    state: &AppState,
    user: &AuthUser,
    payload: Vec<AddWishlistRequest>,
) -> AppResult<ApiResponse<WishlistImport>> {
    let requested = payload.len();
    let product_ids: Vec<Uuid> = payload.into_iter().map(|p| p.product_id).collect();

    let txn = state.orm.begin().await?;

    let known: Vec<Uuid> = if product_ids.is_empty() {
        Vec::new()
    } else {
        Products::find()
            .select_only()
            .column(ProdCol::Id)
            .filter(ProdCol::Id.is_in(product_ids))
            .filter(ProdCol::Status.eq(ProductStatus::Active.as_str()))
            .into_tuple()
            .all(&txn)
            .await?
    };

    let imported = if known.is_empty() {
        0
    } else {
        let now = Utc::now();
        let rows = known.into_iter().map(|product_id| WishlistActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.user_id),
            product_id: Set(product_id),
            created_at: Set(now.into()),
        });
        WishlistItems::insert_many(rows)
            .on_conflict(
                OnConflict::columns([WishCol::UserId, WishCol::ProductId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?
    };

    txn.commit().await?;

    tracing::debug!(user_id = %user.user_id, requested, imported, "wishlist imported");
    log_audit_best_effort(
        &state.pool,
        AuditEntry::new(Some(user.user_id), "wishlist_import", format!("user:{}", user.user_id))
            .new_value(json!({ "requested": requested, "imported": imported })),
    )
    .await;

    Ok(ApiResponse::success(
        "Wishlist imported successfully",
        WishlistImport { requested, imported },
        Some(Meta::empty()),
    ))
}

pub async fn remove_from_wishlist(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = WishlistItems::delete_many()
        .filter(WishCol::UserId.eq(user.user_id))
        .filter(WishCol::ProductId.eq(product_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Wishlist item"));
    }

    log_audit_best_effort(
        &state.pool,
        AuditEntry::new(Some(user.user_id), "wishlist_remove", format!("product:{product_id}")),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from wishlist",
        json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn clear_wishlist(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = WishlistItems::delete_many()
        .filter(WishCol::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Wishlist cleared",
        json!({ "removed": result.rows_affected }),
        Some(Meta::empty()),
    ))
}

fn to_dto(item: wishlist_items::Model, product: Product) -> WishlistItemDto {
    WishlistItemDto {
        id: item.id,
        product,
        created_at: item.created_at.with_timezone(&Utc),
    }
}
