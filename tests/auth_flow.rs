mod common;

use chrono::Duration;
use marketplace_api::{
    dto::auth::{LoginRequest, RefreshRequest, RegisterRequest, TokenKind},
    entity::{Tokens, tokens::Column as TokenCol},
    error::ErrorKind,
    services::{auth_service, token_service::JwtKeys},
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use common::{setup_state, unique};

#[tokio::test]
async fn register_login_refresh_logout() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let email = format!("{}@Example.com", unique("Shopper"));
    let password = "correct horse battery".to_string();

    let user = auth_service::register_user(
        &state,
        RegisterRequest {
            name: "Shopper".into(),
            email: email.clone(),
            password: password.clone(),
        },
    )
    .await?
    .data
    .expect("user");
    assert_eq!(user.email, email.to_lowercase());
    let slugs: Vec<&str> = user.roles.iter().map(|r| r.slug.as_str()).collect();
    assert_eq!(slugs, vec!["user"]);

    let err = auth_service::register_user(
        &state,
        RegisterRequest {
            name: "Again".into(),
            email: email.clone(),
            password: password.clone(),
        },
    )
    .await
    .expect_err("email taken");
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = auth_service::login_user(
        &state,
        LoginRequest {
            email: email.clone(),
            password: "wrong password".into(),
        },
    )
    .await
    .expect_err("bad password");
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);

    let login = auth_service::login_user(&state, LoginRequest { email, password })
        .await?
        .data
        .expect("tokens");
    assert_eq!(login.roles, vec!["user".to_string()]);

    let claims = state.jwt.decode(&login.access_token, TokenKind::Access)?;
    assert_eq!(claims.sub, user.id.to_string());
    assert!(state.jwt.decode(&login.refresh_token, TokenKind::Access).is_err());

    let refreshed = auth_service::refresh_token(
        &state,
        RefreshRequest {
            refresh_token: login.refresh_token.clone(),
        },
    )
    .await?
    .data
    .expect("access token");
    assert_eq!(refreshed.token_type, "Bearer");

    auth_service::logout(
        &state,
        RefreshRequest {
            refresh_token: login.refresh_token.clone(),
        },
    )
    .await?;

    let err = auth_service::refresh_token(
        &state,
        RefreshRequest {
            refresh_token: login.refresh_token,
        },
    )
    .await
    .expect_err("revoked refresh token");
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);

    Ok(())
}

#[tokio::test]
async fn expired_refresh_token_is_rejected_and_its_row_deleted() -> anyhow::Result<()> {
    let Some(mut state) = setup_state().await? else {
        return Ok(());
    };
    state.jwt = JwtKeys::new("integration-test-secret", Duration::minutes(15), Duration::days(-1));

    let email = format!("{}@example.com", unique("stale"));
    let password = "correct horse battery".to_string();
    let user = auth_service::register_user(
        &state,
        RegisterRequest {
            name: "Stale".into(),
            email: email.clone(),
            password: password.clone(),
        },
    )
    .await?
    .data
    .expect("user");

    let login = auth_service::login_user(&state, LoginRequest { email, password })
        .await?
        .data
        .expect("tokens");

    let stored = Tokens::find()
        .filter(TokenCol::UserId.eq(user.id))
        .count(&state.orm)
        .await?;
    assert_eq!(stored, 1);

    let err = auth_service::refresh_token(
        &state,
        RefreshRequest {
            refresh_token: login.refresh_token,
        },
    )
    .await
    .expect_err("expired refresh token");
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    assert_eq!(err.to_string(), "Unauthorized: Refresh token expired");

    let stored = Tokens::find()
        .filter(TokenCol::UserId.eq(user.id))
        .count(&state.orm)
        .await?;
    assert_eq!(stored, 0);

    Ok(())
}
