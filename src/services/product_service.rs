use uuid::Uuid;

use crate::{
    audit::{AuditEntry, log_audit_best_effort},
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::{
        Categories,
        products::{self, ActiveModel, Column, Entity as Products},
        vendors::{Column as VendorCol, Entity as Vendors},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_role},
    models::{Product, ProductStatus, VendorStatus},
    response::{ApiResponse, Meta},
    routes::params::{Paged, ProductQuery, ProductSortBy, SortOrder},
    services::role_service::{ELEVATED_ROLE, ROLE_SUPERADMIN},
    state::AppState,
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde_json::json;

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(Column::Status.eq(ProductStatus::Active.as_str()));

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(category_id) = query.category_id {
        condition = condition.add(Column::CategoryId.eq(category_id));
    }

    if let Some(vendor_id) = query.vendor_id {
        condition = condition.add(Column::VendorId.eq(vendor_id));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    let data = ProductList { items };
    Ok(ApiResponse::success("Products", data, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let result = Products::find_by_id(id)
        .filter(Column::Status.eq(ProductStatus::Active.as_str()))
        .one(&state.orm)
        .await?
        .map(Product::from)
        .ok_or(AppError::NotFound("Product"))?;
    Ok(ApiResponse::success("Product", result, None))
}

/// Only the owner of an active vendor holding the elevated role may list products.
pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_role(user, ELEVATED_ROLE)?;
    validate_product_fields(Some(&payload.name), Some(payload.price), Some(payload.stock))?;

    let vendor = Vendors::find()
        .filter(VendorCol::UserId.eq(user.user_id))
        .filter(VendorCol::Status.eq(VendorStatus::Active.as_str()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::Forbidden)?;

    ensure_category(state, payload.category_id).await?;

    let now = Utc::now();
    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        vendor_id: Set(vendor.id),
        category_id: Set(payload.category_id),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        price: Set(payload.price),
        stock: Set(payload.stock),
        status: Set(ProductStatus::Active.as_str().to_string()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    let product = active.insert(&state.orm).await?;

    log_audit_best_effort(
        &state.pool,
        AuditEntry::new(Some(user.user_id), "product_create", format!("product:{}", product.id))
            .new_value(json!({ "name": product.name, "price": product.price, "stock": product.stock })),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    validate_product_fields(payload.name.as_ref(), payload.price, payload.stock)?;
    let existing = find_managed_product(state, user, id).await?;

    if let Some(category_id) = payload.category_id {
        ensure_category(state, category_id).await?;
    }

    let old_value = json!({ "price": existing.price, "stock": existing.stock });
    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    active.updated_at = Set(Utc::now().into());
    let product = active.update(&state.orm).await?;

    log_audit_best_effort(
        &state.pool,
        AuditEntry::new(Some(user.user_id), "product_update", format!("product:{}", product.id))
            .old_value(old_value)
            .new_value(json!({ "price": product.price, "stock": product.stock })),
    )
    .await;

    Ok(ApiResponse::success(
        "Product updated",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

/// Soft delete: the product is archived so existing order lines keep resolving.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    let existing = find_managed_product(state, user, id).await?;

    let mut active: ActiveModel = existing.into();
    active.status = Set(ProductStatus::Archived.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let product = active.update(&state.orm).await?;

    log_audit_best_effort(
        &state.pool,
        AuditEntry::new(Some(user.user_id), "product_delete", format!("product:{}", product.id)),
    )
    .await;

    Ok(ApiResponse::success(
        "Product deleted",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

async fn find_managed_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<products::Model> {
    let product = Products::find_by_id(id)
        .filter(Column::Status.eq(ProductStatus::Active.as_str()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    if user.has_role(ROLE_SUPERADMIN) {
        return Ok(product);
    }
    if product.user_id != user.user_id || !user.has_role(ELEVATED_ROLE) {
        return Err(AppError::Forbidden);
    }

    // Token roles can outlive a suspension, so the vendor row decides.
    Vendors::find_by_id(product.vendor_id)
        .filter(VendorCol::Status.eq(VendorStatus::Active.as_str()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::Forbidden)?;
    Ok(product)
}

async fn ensure_category(state: &AppState, category_id: Uuid) -> AppResult<()> {
    Categories::find_by_id(category_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid category ID".into()))?;
    Ok(())
}

fn validate_product_fields(
    name: Option<&String>,
    price: Option<i64>,
    stock: Option<i32>,
) -> AppResult<()> {
    if name.is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    if price.is_some_and(|p| p < 0) {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(AppError::BadRequest("stock must not be negative".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_stock_or_price_is_rejected() {
        let name = "Mug".to_string();
        assert!(validate_product_fields(Some(&name), Some(100), Some(0)).is_ok());
        assert!(validate_product_fields(Some(&name), Some(-1), Some(0)).is_err());
        assert!(validate_product_fields(Some(&name), Some(1), Some(-1)).is_err());
        assert!(validate_product_fields(Some(&"  ".to_string()), None, None).is_err());
        assert!(validate_product_fields(None, None, None).is_ok());
    }
}
