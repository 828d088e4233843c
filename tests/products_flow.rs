mod common;

use marketplace_api::{
    dto::products::UpdateProductRequest,
    error::ErrorKind,
    services::{product_service, vendor_service::VendorLifecycle},
};

use common::{create_product, create_shop, create_user, setup_state};

fn reprice(price: i64) -> UpdateProductRequest {
    UpdateProductRequest {
        price: Some(price),
        ..Default::default()
    }
}

#[tokio::test]
async fn suspended_vendor_loses_edit_rights_before_its_token_expires() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let shop = create_shop(&state).await?;
    let product = create_product(&state, &shop, "Teak Bowl", 2400, 6).await?;
    let reviewer = create_user(&state, &["user", "superadmin"]).await?;

    let updated = product_service::update_product(&state, &shop.owner, product.id, reprice(2600))
        .await?
        .data
        .expect("product");
    assert_eq!(updated.price, 2600);

    VendorLifecycle::from_state(&state)
        .suspend(Some(&reviewer), shop.vendor.id)
        .await?;

    // `shop.owner` still carries the admin role from before the suspension.
    assert!(shop.owner.has_role("admin"));
    let err = product_service::update_product(&state, &shop.owner, product.id, reprice(1))
        .await
        .expect_err("vendor is suspended");
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = product_service::delete_product(&state, &shop.owner, product.id)
        .await
        .expect_err("vendor is suspended");
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let updated = product_service::update_product(&state, &reviewer, product.id, reprice(2000))
        .await?
        .data
        .expect("product");
    assert_eq!(updated.price, 2000);

    Ok(())
}

#[tokio::test]
async fn only_the_owner_may_edit_a_product() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let shop = create_shop(&state).await?;
    let product = create_product(&state, &shop, "Clay Cup", 900, 6).await?;
    let rival = create_shop(&state).await?;

    let err = product_service::update_product(&state, &rival.owner, product.id, reprice(1))
        .await
        .expect_err("rival vendor");
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let archived = product_service::delete_product(&state, &shop.owner, product.id)
        .await?
        .data
        .expect("product");
    assert_eq!(archived.status, "archived");

    let err = product_service::get_product(&state, product.id)
        .await
        .expect_err("archived products are hidden");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    Ok(())
}
