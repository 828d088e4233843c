use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::response::ApiResponse;

/// Coarse classification every [`AppError`] falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Forbidden,
    Unauthenticated,
    Validation,
    Internal,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Not enough stock for {product_name}")]
    InsufficientStock { product_name: String },

    #[error("Cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Already has status {0}")]
    NoOpTransition(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Role {0} is not configured")]
    RoleNotFound(String),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::BadRequest(_) => ErrorKind::Validation,
            AppError::Conflict(_)
            | AppError::EmptyCart
            | AppError::InsufficientStock { .. }
            | AppError::InvalidTransition { .. }
            | AppError::NoOpTransition(_) => ErrorKind::Conflict,
            AppError::Forbidden => ErrorKind::Forbidden,
            AppError::Unauthorized(_) => ErrorKind::Unauthenticated,
            AppError::RoleNotFound(_)
            | AppError::DbError(_)
            | AppError::OrmError(_)
            | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            match &self {
                AppError::DbError(err) => tracing::error!(error = %err, "database error"),
                AppError::OrmError(err) => tracing::error!(error = %err, "orm error"),
                AppError::Internal(err) => tracing::error!(error = %err, "internal error"),
                other => tracing::error!(error = %other, "server error"),
            }
        }

        let message = self.to_string();
        let body = ApiResponse::failure(message.clone(), ErrorData { error: message });

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_classify_as_conflict() {
        let errors = [
            AppError::EmptyCart,
            AppError::InsufficientStock {
                product_name: "Mug".into(),
            },
            AppError::NoOpTransition("active".into()),
            AppError::InvalidTransition {
                from: "shipped".into(),
                to: "cancelled".into(),
            },
        ];
        for err in errors {
            assert_eq!(err.kind(), ErrorKind::Conflict, "{err}");
            assert_eq!(err.status_code(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn insufficient_stock_names_the_product() {
        let err = AppError::InsufficientStock {
            product_name: "Ferris Mug".into(),
        };
        assert_eq!(err.to_string(), "Not enough stock for Ferris Mug");
    }

    #[test]
    fn auth_and_lookup_errors_map_to_http_statuses() {
        assert_eq!(
            AppError::Unauthorized("missing token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::NotFound("Vendor").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::RoleNotFound("admin".into()).kind(),
            ErrorKind::Internal
        );
    }
}
