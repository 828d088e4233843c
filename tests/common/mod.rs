#![allow(dead_code)]

use chrono::Utc;
use marketplace_api::{
    config::AppConfig,
    db::{DbPool, create_pool, run_migrations},
    entity::{
        categories::ActiveModel as CategoryActive,
        products::{self, ActiveModel as ProductActive},
        users::ActiveModel as UserActive,
        vendors::{self, ActiveModel as VendorActive},
    },
    middleware::auth::AuthUser,
    services::role_service::{attach_role, find_role_by_slug},
    state::AppState,
};
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

pub fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
}

/// `None` when no database is configured, so the calling test can skip.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let Some(database_url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
        return Ok(None);
    };

    let pool = create_pool(&database_url, 5).await?;
    run_migrations(&pool).await?;

    let config = AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "integration-test-secret".into(),
        access_token_ttl_minutes: 15,
        refresh_token_ttl_days: 7,
        db_max_connections: 5,
    };
    Ok(Some(AppState::new(pool, &config)))
}

/// A pool that refuses every query, for exercising best-effort writes.
pub async fn closed_pool() -> anyhow::Result<DbPool> {
    let url = database_url().ok_or_else(|| anyhow::anyhow!("no database configured"))?;
    let pool = create_pool(&url, 1).await?;
    pool.close().await;
    Ok(pool)
}

/// Unique per call so tests can share one database without truncating it.
pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

pub async fn create_user(state: &AppState, roles: &[&str]) -> anyhow::Result<AuthUser> {
    let now = Utc::now();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set("Test User".into()),
        email: Set(format!("{}@example.com", unique("user"))),
        password_hash: Set("not-a-real-hash".into()),
        is_active: Set(true),
        last_login_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    for slug in roles {
        let role = find_role_by_slug(&state.orm, slug).await?;
        attach_role(&state.orm, user.id, role.id).await?;
    }

    Ok(AuthUser {
        user_id: user.id,
        roles: roles.iter().map(|r| r.to_string()).collect(),
    })
}

pub async fn create_vendor(
    state: &AppState,
    owner: &AuthUser,
    status: &str,
) -> anyhow::Result<vendors::Model> {
    let now = Utc::now();
    let approved = status == "active";
    let vendor = VendorActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(owner.user_id),
        shop_name: Set(unique("shop")),
        status: Set(status.into()),
        approved_by: Set(approved.then_some(owner.user_id)),
        approved_at: Set(approved.then(|| now.into())),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(vendor)
}

/// An active vendor with one category, ready to own products.
pub struct Shop {
    pub owner: AuthUser,
    pub vendor: vendors::Model,
    pub category_id: Uuid,
}

pub async fn create_shop(state: &AppState) -> anyhow::Result<Shop> {
    let owner = create_user(state, &["user", "admin"]).await?;
    let vendor = create_vendor(state, &owner, "active").await?;
    let slug = unique("category");
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(slug.clone()),
        slug: Set(slug),
        description: Set(None),
        parent_id: Set(None),
    }
    .insert(&state.orm)
    .await?;
    Ok(Shop {
        owner,
        vendor,
        category_id: category.id,
    })
}

pub async fn create_product(
    state: &AppState,
    shop: &Shop,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<products::Model> {
    let now = Utc::now();
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(shop.owner.user_id),
        vendor_id: Set(shop.vendor.id),
        category_id: Set(shop.category_id),
        name: Set(name.into()),
        description: Set(None),
        price: Set(price),
        stock: Set(stock),
        status: Set("active".into()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(product)
}
