use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use sea_orm::sea_query::{Expr, LockType};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::{AuditEntry, log_audit_best_effort},
    dto::orders::{OrderList, OrderWithItems, PlaceOrderRequest},
    entity::{
        cart_items::{self, Column as CartItemCol, Entity as CartItems},
        carts::{Column as CartCol, Entity as Carts},
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus, ProductStatus},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, Paged, SortOrder},
    state::AppState,
};

/// A cart line joined with the live product row it points at.
#[derive(Debug, Clone, FromQueryResult)]
pub struct CheckoutLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub product_name: String,
    pub product_status: String,
    pub price: i64,
    pub stock: i32,
}

impl CheckoutLine {
    pub fn ensure_available(&self) -> AppResult<()> {
        if self.quantity <= 0 {
            return Err(AppError::BadRequest("Cart has invalid quantity".into()));
        }
        if self.product_status != ProductStatus::Active.as_str() {
            return Err(AppError::Conflict(format!(
                "{} is no longer available",
                self.product_name
            )));
        }
        if self.stock < self.quantity {
            return Err(self.shortfall());
        }
        Ok(())
    }

    pub fn subtotal(&self) -> AppResult<i64> {
        self.price
            .checked_mul(i64::from(self.quantity))
            .ok_or_else(|| AppError::BadRequest("order total out of range".into()))
    }

    fn shortfall(&self) -> AppError {
        AppError::InsufficientStock {
            product_name: self.product_name.clone(),
        }
    }
}

pub fn order_total(lines: &[CheckoutLine]) -> AppResult<i64> {
    lines.iter().try_fold(0i64, |total, line| {
        total
            .checked_add(line.subtotal()?)
            .ok_or_else(|| AppError::BadRequest("order total out of range".into()))
    })
}

pub fn ensure_cancellable(current: &str) -> AppResult<()> {
    if current != OrderStatus::Pending.as_str() {
        return Err(AppError::InvalidTransition {
            from: current.to_string(),
            to: OrderStatus::Cancelled.to_string(),
        });
    }
    Ok(())
}

/// Turn the caller's cart into an order.
///
/// Stock checks, guarded stock decrements, the order insert and clearing
/// the cart run in one transaction. Any early return drops `txn`, and a
/// dropped transaction rolls back, so a panic mid-sequence also leaves
/// stock, cart and orders untouched.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let shipping_address = payload.shipping_address.trim().to_string();
    let payment_method = payload.payment_method.trim().to_string();
    if shipping_address.is_empty() || payment_method.is_empty() {
        return Err(AppError::BadRequest(
            "shipping_address and payment_method are required".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    let cart = Carts::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .one(&txn)
        .await?
        .ok_or(AppError::EmptyCart)?;

    // Row locks on the joined products serialize concurrent checkouts of the same item.
    let lines = CartItems::find()
        .select_only()
        .column(CartItemCol::ProductId)
        .column(CartItemCol::Quantity)
        .column_as(ProdCol::Name, "product_name")
        .column_as(ProdCol::Status, "product_status")
        .column_as(ProdCol::Price, "price")
        .column_as(ProdCol::Stock, "stock")
        .join(JoinType::InnerJoin, cart_items::Relation::Products.def())
        .filter(CartItemCol::CartId.eq(cart.id))
        .order_by_asc(CartItemCol::CreatedAt)
        .order_by_asc(CartItemCol::Id)
        .lock(LockType::Update)
        .into_model::<CheckoutLine>()
        .all(&txn)
        .await?;

    if lines.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let mut total_amount: i64 = 0;
    for line in &lines {
        line.ensure_available()?;
        total_amount = total_amount
            .checked_add(line.subtotal()?)
            .ok_or_else(|| AppError::BadRequest("order total out of range".into()))?;
        decrement_stock(&txn, line).await?;
    }

    let now = Utc::now();
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        total_amount: Set(total_amount),
        shipping_address: Set(shipping_address),
        payment_method: Set(payment_method),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(lines.len());
    for line in lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            product_name: Set(line.product_name),
            quantity: Set(line.quantity),
            unit_price: Set(line.price),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;
        items.push(OrderItem::from(item));
    }

    CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        total_amount,
        lines = items.len(),
        "order placed"
    );

    log_audit_best_effort(
        &state.pool,
        AuditEntry::new(Some(user.user_id), "place_order", format!("order:{}", order.id))
            .new_value(json!({ "status": order.status, "total_amount": order.total_amount })),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// `stock = stock - q` guarded by `stock >= q`; a lost race shows up as zero affected rows.
async fn decrement_stock<C: ConnectionTrait>(conn: &C, line: &CheckoutLine) -> AppResult<()> {
    let result = Products::update_many()
        .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(line.quantity))
        .col_expr(ProdCol::UpdatedAt, Expr::current_timestamp().into())
        .filter(ProdCol::Id.eq(line.product_id))
        .filter(ProdCol::Stock.gte(line.quantity))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(line.shortfall());
    }
    Ok(())
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        let status = status.parse::<OrderStatus>()?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
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
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;

    let items = load_items(&state.orm, order.id).await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Cancel a pending order. Stock decremented at placement is not returned.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let owned = Condition::all()
        .add(OrderCol::UserId.eq(user.user_id))
        .add(OrderCol::Id.eq(id));

    let order = Orders::find()
        .filter(owned.clone())
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    ensure_cancellable(&order.status)?;

    let result = Orders::update_many()
        .col_expr(OrderCol::Status, Expr::value(OrderStatus::Cancelled.as_str()))
        .col_expr(OrderCol::UpdatedAt, Expr::current_timestamp().into())
        .filter(owned.clone())
        .filter(OrderCol::Status.eq(OrderStatus::Pending.as_str()))
        .exec(&state.orm)
        .await?;

    let order = Orders::find()
        .filter(owned)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;

    // Zero rows means an admin moved the order on between the read and the update.
    if result.rows_affected == 0 {
        ensure_cancellable(&order.status)?;
    }

    let items = load_items(&state.orm, order.id).await?;

    Ok(ApiResponse::success(
        "Order cancelled successfully",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn load_items<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn line(name: &str, price: i64, quantity: i32, stock: i32) -> CheckoutLine {
        CheckoutLine {
            product_id: Uuid::new_v4(),
            quantity,
            product_name: name.to_string(),
            product_status: "active".to_string(),
            price,
            stock,
        }
    }

    #[test]
    fn total_is_sum_of_price_times_quantity() {
        let lines = vec![line("p1", 10, 2, 5), line("p2", 5, 1, 5)];
        assert_eq!(order_total(&lines).unwrap(), 25);
    }

    #[test]
    fn first_short_line_is_reported() {
        let lines = vec![
            line("Hoodie", 100, 1, 10),
            line("Mug", 50, 3, 2),
            line("Sticker", 5, 9, 0),
        ];
        let err = lines
            .iter()
            .try_for_each(CheckoutLine::ensure_available)
            .unwrap_err();
        match err {
            AppError::InsufficientStock { product_name } => assert_eq!(product_name, "Mug"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn exact_stock_is_enough() {
        assert!(line("Mug", 50, 3, 3).ensure_available().is_ok());
    }

    #[test]
    fn archived_product_cannot_be_ordered() {
        let mut archived = line("Old Mug", 50, 1, 10);
        archived.product_status = "archived".into();
        assert_eq!(
            archived.ensure_available().unwrap_err().kind(),
            ErrorKind::Conflict
        );
    }

    #[test]
    fn overflowing_total_is_rejected() {
        let lines = vec![line("Gold", i64::MAX, 2, 5)];
        assert!(matches!(order_total(&lines), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn only_pending_orders_can_be_cancelled() {
        assert!(ensure_cancellable("pending").is_ok());
        for status in ["processing", "shipped", "delivered", "cancelled"] {
            let err = ensure_cancellable(status).unwrap_err();
            assert!(
                matches!(err, AppError::InvalidTransition { ref from, .. } if from == status),
                "{status}"
            );
        }
    }
}
