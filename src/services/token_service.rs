use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dto::auth::{Claims, TokenKind},
    error::{AppError, AppResult},
};

/// Signing material and lifetimes for the access/refresh token pair.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

#[derive(Debug)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

impl JwtKeys {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            Duration::minutes(config.access_token_ttl_minutes),
            Duration::days(config.refresh_token_ttl_days),
        )
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn issue_access(&self, user_id: Uuid, roles: &[String]) -> AppResult<IssuedToken> {
        self.issue(user_id, roles.to_vec(), TokenKind::Access, self.access_ttl, None)
    }

    /// Refresh tokens carry a unique `jti` so two logins never produce the same string.
    pub fn issue_refresh(&self, user_id: Uuid) -> AppResult<IssuedToken> {
        let jti = Uuid::new_v4().to_string();
        self.issue(user_id, Vec::new(), TokenKind::Refresh, self.refresh_ttl, Some(jti))
    }

    pub fn issue_pair(&self, user_id: Uuid, roles: &[String]) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access: self.issue_access(user_id, roles)?,
            refresh: self.issue_refresh(user_id)?,
        })
    }

    /// Refresh tokens skip the `exp` check here; their expiry is enforced against the
    /// stored row so the caller can delete it.
    pub fn decode(&self, token: &str, expected: TokenKind) -> AppResult<Claims> {
        let mut validation = Validation::default();
        if expected == TokenKind::Refresh {
            validation.validate_exp = false;
        }
        let decoded = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;
        if decoded.claims.kind != expected {
            return Err(AppError::Unauthorized("Wrong token type".into()));
        }
        Ok(decoded.claims)
    }

    fn issue(
        &self,
        user_id: Uuid,
        roles: Vec<String>,
        kind: TokenKind,
        ttl: Duration,
        jti: Option<String>,
    ) -> AppResult<IssuedToken> {
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

        let claims = Claims {
            sub: user_id.to_string(),
            roles,
            kind,
            exp: expires_at.timestamp().max(0) as usize,
            jti,
        };

        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

        Ok(IssuedToken { token, expires_at })
    }
}

pub fn user_id_from_claims(claims: &Claims) -> AppResult<Uuid> {
    Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))
}
