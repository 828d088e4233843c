mod common;

use marketplace_api::{
    dto::{
        cart::AddToCartRequest,
        orders::{PlaceOrderRequest, UpdateOrderStatusRequest},
    },
    entity::{
        Orders, Products,
        orders::Column as OrderCol,
        products::ActiveModel as ProductActive,
    },
    error::{AppError, ErrorKind},
    middleware::auth::AuthUser,
    models::OrderStatus,
    services::{admin_service, cart_service, order_service},
    state::AppState,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

use common::{create_product, create_shop, create_user, setup_state};

fn checkout() -> PlaceOrderRequest {
    PlaceOrderRequest {
        shipping_address: "1 Ferris Lane".into(),
        payment_method: "cod".into(),
    }
}

async fn add(state: &AppState, user: &AuthUser, product_id: Uuid, quantity: i32) -> anyhow::Result<()> {
    cart_service::add_to_cart(state, user, AddToCartRequest { product_id, quantity }).await?;
    Ok(())
}

async fn stock_of(state: &AppState, id: Uuid) -> anyhow::Result<i32> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {id} missing"))?;
    Ok(product.stock)
}

#[tokio::test]
async fn placing_an_order_totals_lines_decrements_stock_and_clears_cart() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let shop = create_shop(&state).await?;
    let p1 = create_product(&state, &shop, "Hoodie", 10, 5).await?;
    let p2 = create_product(&state, &shop, "Mug", 5, 5).await?;
    let buyer = create_user(&state, &["user"]).await?;

    add(&state, &buyer, p1.id, 2).await?;
    add(&state, &buyer, p2.id, 1).await?;

    let placed = order_service::place_order(&state, &buyer, checkout())
        .await?
        .data
        .expect("order data");
    assert_eq!(placed.order.total_amount, 25);
    assert_eq!(placed.order.status, "pending");
    assert_eq!(placed.items.len(), 2);

    assert_eq!(stock_of(&state, p1.id).await?, 3);
    assert_eq!(stock_of(&state, p2.id).await?, 4);

    let cart = cart_service::get_cart(&state, &buyer).await?.data.expect("cart");
    assert!(cart.items.is_empty());

    // Repricing the product must not touch the stored order line.
    let mut reprice: ProductActive = p1.clone().into();
    reprice.price = Set(99);
    reprice.update(&state.orm).await?;

    let fetched = order_service::get_order(&state, &buyer, placed.order.id)
        .await?
        .data
        .expect("order");
    let line = fetched
        .items
        .iter()
        .find(|i| i.product_id == p1.id)
        .expect("hoodie line");
    assert_eq!(line.unit_price, 10);
    assert_eq!(line.product_name, "Hoodie");
    assert_eq!(fetched.order.total_amount, 25);

    Ok(())
}

#[tokio::test]
async fn shortfall_on_a_later_line_rolls_back_everything() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let shop = create_shop(&state).await?;
    let plenty = create_product(&state, &shop, "Sticker Pack", 50, 5).await?;
    let scarce = create_product(&state, &shop, "Limited Print", 300, 2).await?;
    let buyer = create_user(&state, &["user"]).await?;

    add(&state, &buyer, plenty.id, 2).await?;
    add(&state, &buyer, scarce.id, 3).await?;

    let err = order_service::place_order(&state, &buyer, checkout())
        .await
        .expect_err("order must fail");
    match err {
        AppError::InsufficientStock { ref product_name } => assert_eq!(product_name, "Limited Print"),
        ref other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::Conflict);

    assert_eq!(stock_of(&state, plenty.id).await?, 5);
    assert_eq!(stock_of(&state, scarce.id).await?, 2);

    let cart = cart_service::get_cart(&state, &buyer).await?.data.expect("cart");
    assert_eq!(cart.items.len(), 2);

    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(buyer.user_id))
        .count(&state.orm)
        .await?;
    assert_eq!(orders, 0);

    Ok(())
}

#[tokio::test]
async fn empty_cart_cannot_be_ordered() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let buyer = create_user(&state, &["user"]).await?;

    let err = order_service::place_order(&state, &buyer, checkout())
        .await
        .expect_err("no cart yet");
    assert!(matches!(err, AppError::EmptyCart));

    cart_service::get_cart(&state, &buyer).await?;
    let err = order_service::place_order(&state, &buyer, checkout())
        .await
        .expect_err("cart exists but is empty");
    assert!(matches!(err, AppError::EmptyCart));

    Ok(())
}

#[tokio::test]
async fn only_pending_orders_can_be_cancelled() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let shop = create_shop(&state).await?;
    let product = create_product(&state, &shop, "Notebook", 700, 10).await?;
    let buyer = create_user(&state, &["user"]).await?;
    let staff = create_user(&state, &["user", "admin"]).await?;

    add(&state, &buyer, product.id, 1).await?;
    let shipped = order_service::place_order(&state, &buyer, checkout())
        .await?
        .data
        .expect("order");
    admin_service::update_order_status(
        &state,
        &staff,
        shipped.order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Shipped,
        },
    )
    .await?;

    let err = order_service::cancel_order(&state, &buyer, shipped.order.id)
        .await
        .expect_err("shipped order is not cancellable");
    assert!(matches!(err, AppError::InvalidTransition { ref from, .. } if from == "shipped"));

    add(&state, &buyer, product.id, 2).await?;
    let pending = order_service::place_order(&state, &buyer, checkout())
        .await?
        .data
        .expect("order");
    let cancelled = order_service::cancel_order(&state, &buyer, pending.order.id)
        .await?
        .data
        .expect("order");
    assert_eq!(cancelled.order.status, "cancelled");

    // Cancellation does not restock.
    assert_eq!(stock_of(&state, product.id).await?, 7);

    Ok(())
}

#[tokio::test]
async fn order_status_overwrite_requires_admin() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let shop = create_shop(&state).await?;
    let product = create_product(&state, &shop, "Pen", 100, 3).await?;
    let buyer = create_user(&state, &["user"]).await?;

    add(&state, &buyer, product.id, 1).await?;
    let placed = order_service::place_order(&state, &buyer, checkout())
        .await?
        .data
        .expect("order");

    let err = admin_service::update_order_status(
        &state,
        &buyer,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Delivered,
        },
    )
    .await
    .expect_err("plain user cannot change status");
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let other = create_user(&state, &["user"]).await?;
    let err = order_service::get_order(&state, &other, placed.order.id)
        .await
        .expect_err("orders are scoped to their owner");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_never_oversell() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let shop = create_shop(&state).await?;
    let product = create_product(&state, &shop, "Last Few Tees", 1500, 3).await?;

    let mut buyers = Vec::new();
    for _ in 0..10 {
        let buyer = create_user(&state, &["user"]).await?;
        add(&state, &buyer, product.id, 1).await?;
        buyers.push(buyer);
    }

    let handles: Vec<_> = buyers
        .into_iter()
        .map(|buyer| {
            let state = state.clone();
            tokio::spawn(async move { order_service::place_order(&state, &buyer, checkout()).await })
        })
        .collect();

    let mut placed = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => placed += 1,
            Err(AppError::InsufficientStock { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(placed, 3);
    assert_eq!(stock_of(&state, product.id).await?, 0);

    Ok(())
}
