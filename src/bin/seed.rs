use anyhow::Context;
use chrono::Utc;
use marketplace_api::{
    config::database_url_from_env,
    db::{OrmConn, create_orm_conn, create_pool, run_migrations},
    entity::{
        categories::{ActiveModel as CategoryActive, Column as CategoryCol, Entity as Categories},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    services::{
        auth_service::hash_password,
        role_service::{ROLE_SUPERADMIN, ROLE_USER, attach_role, find_role_by_slug},
    },
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, sea_query::OnConflict};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

const CATEGORIES: [(&str, &str, &str); 4] = [
    ("Apparel", "apparel", "Clothing and accessories"),
    ("Home", "home", "Kitchen and living"),
    ("Stationery", "stationery", "Stickers, notebooks and pens"),
    ("Books", "books", "Print and digital books"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new("info"))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = database_url_from_env()?;
    let email = std::env::var("SUPER_USER_EMAIL").context("SUPER_USER_EMAIL is not set")?;
    let password = std::env::var("SUPER_USER_PASSWORD").context("SUPER_USER_PASSWORD is not set")?;

    let pool = create_pool(&database_url, 2).await?;
    run_migrations(&pool).await?;
    let orm = create_orm_conn(&pool);

    let super_id = ensure_super_user(&orm, &email, &password).await?;
    seed_categories(&orm).await?;

    tracing::info!(user_id = %super_id, "seed completed");
    Ok(())
}

async fn ensure_super_user(orm: &OrmConn, email: &str, password: &str) -> anyhow::Result<Uuid> {
    let email = email.trim().to_lowercase();
    let existing = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(orm)
        .await?;

    let user_id = match existing {
        Some(user) => user.id,
        None => {
            let now = Utc::now();
            let user = UserActive {
                id: Set(Uuid::new_v4()),
                name: Set("Super Admin".into()),
                email: Set(email.clone()),
                password_hash: Set(hash_password(password)?),
                is_active: Set(true),
                last_login_at: Set(None),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            }
            .insert(orm)
            .await?;
            user.id
        }
    };

    for slug in [ROLE_USER, ROLE_SUPERADMIN] {
        let role = find_role_by_slug(orm, slug).await?;
        attach_role(orm, user_id, role.id).await?;
    }

    tracing::info!(%email, "ensured super user");
    Ok(user_id)
}

async fn seed_categories(orm: &OrmConn) -> anyhow::Result<()> {
    for (name, slug, description) in CATEGORIES {
        let category = CategoryActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.into()),
            slug: Set(slug.into()),
            description: Set(Some(description.into())),
            parent_id: Set(None),
        };
        Categories::insert(category)
            .on_conflict(OnConflict::column(CategoryCol::Slug).do_nothing().to_owned())
            .exec_without_returning(orm)
            .await?;
    }

    tracing::info!(count = CATEGORIES.len(), "seeded categories");
    Ok(())
}
