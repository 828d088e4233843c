mod common;

use marketplace_api::{
    dto::cart::{AddToCartRequest, UpdateCartItemRequest},
    error::{AppError, ErrorKind},
    services::cart_service,
};
use uuid::Uuid;

use common::{create_product, create_shop, create_user, setup_state};

#[tokio::test]
async fn adding_the_same_product_grows_the_line() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let shop = create_shop(&state).await?;
    let product = create_product(&state, &shop, "Socks", 400, 20).await?;
    let buyer = create_user(&state, &["user"]).await?;

    cart_service::add_to_cart(&state, &buyer, AddToCartRequest { product_id: product.id, quantity: 2 })
        .await?;
    let cart = cart_service::add_to_cart(&state, &buyer, AddToCartRequest { product_id: product.id, quantity: 3 })
        .await?
        .data
        .expect("cart");

    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 5);
    assert_eq!(cart.total_amount, 2000);

    let err = cart_service::add_to_cart(&state, &buyer, AddToCartRequest { product_id: Uuid::new_v4(), quantity: 1 })
        .await
        .expect_err("unknown product");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    Ok(())
}

#[tokio::test]
async fn line_quantity_updates_must_be_positive() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let shop = create_shop(&state).await?;
    let product = create_product(&state, &shop, "Cap", 900, 5).await?;
    let buyer = create_user(&state, &["user"]).await?;

    let cart = cart_service::add_to_cart(&state, &buyer, AddToCartRequest { product_id: product.id, quantity: 1 })
        .await?
        .data
        .expect("cart");
    let item_id = cart.items[0].id;

    let err = cart_service::update_cart_item(&state, &buyer, item_id, UpdateCartItemRequest { quantity: 0 })
        .await
        .expect_err("zero quantity");
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let cart = cart_service::update_cart_item(&state, &buyer, item_id, UpdateCartItemRequest { quantity: 4 })
        .await?
        .data
        .expect("cart");
    assert_eq!(cart.items[0].quantity, 4);
    assert_eq!(cart.total_amount, 3600);

    let cart = cart_service::remove_from_cart(&state, &buyer, item_id)
        .await?
        .data
        .expect("cart");
    assert!(cart.items.is_empty());

    let err = cart_service::remove_from_cart(&state, &buyer, item_id)
        .await
        .expect_err("already removed");
    assert!(matches!(err, AppError::NotFound("Cart item")));

    Ok(())
}

#[tokio::test]
async fn cart_changes_are_scoped_to_the_owner() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let shop = create_shop(&state).await?;
    let product = create_product(&state, &shop, "Scarf", 1200, 5).await?;
    let owner = create_user(&state, &["user"]).await?;
    let stranger = create_user(&state, &["user"]).await?;

    let cart = cart_service::add_to_cart(&state, &owner, AddToCartRequest { product_id: product.id, quantity: 2 })
        .await?
        .data
        .expect("cart");
    let item_id = cart.items[0].id;

    let err = cart_service::remove_from_cart(&state, &stranger, item_id)
        .await
        .expect_err("stranger has no cart yet");
    assert!(matches!(err, AppError::NotFound("Cart")));

    cart_service::get_cart(&state, &stranger).await?;
    let err = cart_service::remove_from_cart(&state, &stranger, item_id)
        .await
        .expect_err("item belongs to another cart");
    assert!(matches!(err, AppError::NotFound("Cart item")));

    let err = cart_service::update_cart_item(&state, &stranger, item_id, UpdateCartItemRequest { quantity: 9 })
        .await
        .expect_err("item belongs to another cart");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    cart_service::clear_cart(&state, &stranger).await?;

    let cart = cart_service::get_cart(&state, &owner).await?.data.expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);

    cart_service::clear_cart(&state, &owner).await?;
    let cart = cart_service::get_cart(&state, &owner).await?.data.expect("cart");
    assert!(cart.items.is_empty());

    Ok(())
}
