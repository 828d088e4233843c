use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::Utc;
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::{AuditEntry, log_audit_best_effort},
    dto::auth::{
        AccessTokenResponse, LoginRequest, LoginResponse, RefreshRequest, RegisterRequest,
        TokenKind,
    },
    entity::{
        Roles,
        tokens::{ActiveModel as TokenActive, Column as TokenCol, Entity as Tokens},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    services::{
        role_service::{ROLE_USER, attach_role, find_role_by_slug, load_user_with_roles},
        token_service::user_id_from_claims,
    },
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let RegisterRequest {
        name,
        email,
        password,
    } = payload;
    let email = email.trim().to_lowercase();
    validate_registration(&name, &email, &password)?;

    let exist = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::Conflict("Email is already taken".to_string()));
    }

    let password_hash = hash_password(&password)?;

    let txn = state.orm.begin().await?;
    let now = Utc::now();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.trim().to_string()),
        email: Set(email),
        password_hash: Set(password_hash),
        is_active: Set(true),
        last_login_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let role = find_role_by_slug(&txn, ROLE_USER).await?;
    attach_role(&txn, user.id, role.id).await?;
    txn.commit().await?;

    log_audit_best_effort(
        &state.pool,
        AuditEntry::new(Some(user.id), "user_register", format!("user:{}", user.id)),
    )
    .await;

    Ok(ApiResponse::success(
        "User created",
        User::from_entity(user, vec![role]),
        None,
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let email = email.trim().to_lowercase();
    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;

    let user = match user {
        Some(u) if u.is_active => u,
        _ => return Err(AppError::Unauthorized("Invalid email or password".into())),
    };

    verify_password(&password, &user.password_hash)?;

    let roles = user.find_related(Roles).all(&state.orm).await?;
    let role_slugs: Vec<String> = roles.iter().map(|r| r.slug.clone()).collect();
    let pair = state.jwt.issue_pair(user.id, &role_slugs)?;

    TokenActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        token: Set(pair.refresh.token.clone()),
        roles: Set(role_slugs.join(",")),
        expires_at: Set(pair.refresh.expires_at.into()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    let user_id = user.id;
    let mut active: UserActive = user.into();
    active.last_login_at = Set(Some(Utc::now().into()));
    active.update(&state.orm).await?;

    log_audit_best_effort(
        &state.pool,
        AuditEntry::new(Some(user_id), "user_login", format!("user:{user_id}")),
    )
    .await;

    let resp = LoginResponse {
        access_token: pair.access.token,
        refresh_token: pair.refresh.token,
        token_type: "Bearer".into(),
        expires_in: state.jwt.access_ttl_secs(),
        roles: role_slugs,
    };

    Ok(ApiResponse::success("Logged in", resp, Some(Meta::empty())))
}

/// Issue a fresh access token from a stored refresh token.
///
/// Expired rows are deleted here; nothing sweeps them in the background.
pub async fn refresh_token(
    state: &AppState,
    payload: RefreshRequest,
) -> AppResult<ApiResponse<AccessTokenResponse>> {
    let claims = state.jwt.decode(&payload.refresh_token, TokenKind::Refresh)?;
    let user_id = user_id_from_claims(&claims)?;

    let stored = Tokens::find()
        .filter(TokenCol::Token.eq(payload.refresh_token.as_str()))
        .filter(TokenCol::UserId.eq(user_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Refresh token not valid".into()))?;

    if stored.expires_at.with_timezone(&Utc) <= Utc::now() {
        stored.delete(&state.orm).await?;
        return Err(AppError::Unauthorized("Refresh token expired".into()));
    }

    let user = load_user_with_roles(&state.orm, user_id)
        .await?
        .filter(|u| u.user.is_active)
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    let access = state.jwt.issue_access(user_id, &user.role_slugs())?;

    Ok(ApiResponse::success(
        "Token refreshed",
        AccessTokenResponse {
            access_token: access.token,
            token_type: "Bearer".into(),
            expires_in: state.jwt.access_ttl_secs(),
        },
        Some(Meta::empty()),
    ))
}

pub async fn logout(
    state: &AppState,
    payload: RefreshRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Tokens::delete_many()
        .filter(TokenCol::Token.eq(payload.refresh_token.as_str()))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Refresh token"));
    }

    Ok(ApiResponse::success(
        "Logged out successfully",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let loaded = load_user_with_roles(&state.orm, user.user_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(ApiResponse::success(
        "User profile fetched successfully",
        User::from_entity(loaded.user, loaded.roles),
        Some(Meta::empty()),
    ))
}

fn validate_registration(name: &str, email: &str, password: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_email {
        return Err(AppError::BadRequest("email is invalid".into()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn verify_password(password: &str, password_hash: &str) -> AppResult<()> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::Unauthorized("Invalid email or password".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_rejects_malformed_input() {
        assert!(validate_registration("", "a@b.io", "longenough").is_err());
        assert!(validate_registration("Ann", "not-an-email", "longenough").is_err());
        assert!(validate_registration("Ann", "@b.io", "longenough").is_err());
        assert!(validate_registration("Ann", "ann@b.io", "short").is_err());
        assert!(validate_registration("Ann", "ann@b.io", "longenough").is_ok());
    }

    #[test]
    fn hashed_password_verifies_only_with_same_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AppError::Unauthorized(_))
        ));
    }
}
