use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::types::response::ApiResponse;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Database migration error: {0}")]
    DatabaseMigration(#[from] sqlx::migrate::MigrateError),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
    #[error("Bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("Admin seeding failed: {0}")]
    Seed(#[from] Error),
}

/// The failure categories a client can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidCredentials,
    TokenExpiredOrInvalid,
    InsufficientRole,
    NotFound,
    DuplicateUsername,
    ValidationError,
    Internal,
}

impl ErrorKind {
    pub(crate) fn status(self) -> StatusCode {
        match self {
            ErrorKind::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ErrorKind::TokenExpiredOrInvalid => StatusCode::UNAUTHORIZED,
            ErrorKind::InsufficientRole => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::DuplicateUsername => StatusCode::CONFLICT,
            ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classifies error responses that were not produced by [`Error`], such as
    /// extractor rejections and unmatched routes.
    pub(crate) fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ErrorKind::TokenExpiredOrInvalid,
            StatusCode::FORBIDDEN => ErrorKind::InsufficientRole,
            StatusCode::NOT_FOUND => ErrorKind::NotFound,
            StatusCode::CONFLICT => ErrorKind::DuplicateUsername,
            status if status.is_client_error() => ErrorKind::ValidationError,
            _ => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Incorrect username or password")]
    InvalidCredentials,
    #[error("Could not validate credentials")]
    TokenExpiredOrInvalid,
    #[error("Not enough permissions")]
    InsufficientRole,
    #[error("User not found")]
    UserNotFound,
    #[error("Widget not found")]
    WidgetNotFound,
    #[error("Username already registered")]
    DuplicateUsername,
    #[error("{0}")]
    Validation(String),
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
    #[error("Bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("Worker task failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),
}

impl Error {
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidCredentials => ErrorKind::InvalidCredentials,
            Error::TokenExpiredOrInvalid => ErrorKind::TokenExpiredOrInvalid,
            Error::InsufficientRole => ErrorKind::InsufficientRole,
            Error::UserNotFound | Error::WidgetNotFound => ErrorKind::NotFound,
            Error::DuplicateUsername => ErrorKind::DuplicateUsername,
            Error::Validation(_) => ErrorKind::ValidationError,
            Error::Sql(_) | Error::Bcrypt(_) | Error::Jwt(_) | Error::Blocking(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let kind = self.kind();

        let message = match kind {
            ErrorKind::Internal => {
                tracing::error!("{:?}", self);
                "Internal server error".to_owned()
            }
            _ => {
                tracing::debug!("{:?}", self);
                self.to_string()
            }
        };

        let mut response =
            (kind.status(), Json(ApiResponse::<()>::error(kind, message))).into_response();

        if kind.status() == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static("Bearer"),
            );
        }

        response.extensions_mut().insert(kind);

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_and_absence_share_a_kind() {
        assert_eq!(Error::WidgetNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(Error::UserNotFound.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = Error::Sql(sqlx::Error::PoolTimedOut).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.extensions().get::<ErrorKind>(),
            Some(&ErrorKind::Internal)
        );
    }

    #[test]
    fn unauthorized_responses_carry_challenge() {
        let response = Error::TokenExpiredOrInvalid.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn classifies_foreign_statuses() {
        assert_eq!(
            ErrorKind::from_status(StatusCode::UNPROCESSABLE_ENTITY),
            ErrorKind::ValidationError
        );
        assert_eq!(
            ErrorKind::from_status(StatusCode::NOT_FOUND),
            ErrorKind::NotFound
        );
        assert_eq!(
            ErrorKind::from_status(StatusCode::BAD_GATEWAY),
            ErrorKind::Internal
        );
    }
}
