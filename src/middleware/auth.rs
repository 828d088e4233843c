use axum::{extract::FromRequestParts, http::header};
use uuid::Uuid;

use crate::{
    dto::auth::TokenKind,
    error::AppError,
    services::{
        role_service::{ROLE_ADMIN, ROLE_SUPERADMIN},
        token_service::user_id_from_claims,
    },
    state::AppState,
};

/// Caller identity resolved from the bearer access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn has_role(&self, slug: &str) -> bool {
        self.roles.iter().any(|r| r == slug)
    }
}

pub fn ensure_role(user: &AuthUser, role: &str) -> Result<(), AppError> {
    if !user.has_role(role) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_any_role(user: &AuthUser, roles: &[&str]) -> Result<(), AppError> {
    if roles.iter().any(|role| user.has_role(role)) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_any_role(user, &[ROLE_ADMIN, ROLE_SUPERADMIN])
}

pub fn ensure_superadmin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, ROLE_SUPERADMIN)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;

        let claims = state.jwt.decode(token, TokenKind::Access)?;
        let user_id = user_id_from_claims(&claims)?;

        Ok(AuthUser {
            user_id,
            roles: claims.roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(roles: &[&str]) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn admin_check_accepts_admin_or_superadmin() {
        assert!(ensure_admin(&user_with(&["user", "admin"])).is_ok());
        assert!(ensure_admin(&user_with(&["superadmin"])).is_ok());
        assert!(matches!(
            ensure_admin(&user_with(&["user"])),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn superadmin_check_is_exact() {
        assert!(ensure_superadmin(&user_with(&["superadmin"])).is_ok());
        assert!(ensure_superadmin(&user_with(&["admin"])).is_err());
        assert!(ensure_superadmin(&user_with(&[])).is_err());
    }
}
