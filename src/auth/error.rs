use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use super::policy::PasswordRule;

/// Which unique column a registration collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateField {
    Username,
    Email,
}

impl std::fmt::Display for DuplicateField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateField::Username => f.write_str("username"),
            DuplicateField::Email => f.write_str("email"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("a user with this {0} already exists")]
    DuplicateUser(DuplicateField),

    #[error("password does not satisfy policy: {}", join_rules(.0))]
    WeakPassword(Vec<PasswordRule>),

    #[error("username contains characters outside the allowed set")]
    InvalidUsername,

    #[error("email address is not valid")]
    InvalidEmail,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    ExpiredToken,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::InvalidRequest(rejection.body_text())
    }
}

fn join_rules(rules: &[PasswordRule]) -> String {
    rules
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl AuthError {
    /// Machine-readable reason code sent to clients.
    ///
    /// Both token failures share one code so a caller cannot tell a forged
    /// token from an expired one.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::DuplicateUser(_) => "DuplicateUser",
            AuthError::WeakPassword(_) => "WeakPassword",
            AuthError::InvalidUsername => "InvalidUsername",
            AuthError::InvalidEmail => "InvalidEmail",
            AuthError::InvalidRequest(_) => "InvalidRequest",
            AuthError::InvalidCredentials => "InvalidCredentials",
            AuthError::InvalidToken | AuthError::ExpiredToken => "InvalidToken",
            AuthError::StorageUnavailable(_) | AuthError::Hashing(_) | AuthError::Internal(_) => {
                "InternalError"
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::DuplicateUser(_)
            | AuthError::WeakPassword(_)
            | AuthError::InvalidUsername
            | AuthError::InvalidEmail
            | AuthError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::ExpiredToken => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::StorageUnavailable(_) | AuthError::Hashing(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_rules: Vec<PasswordRule>,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AuthError::StorageUnavailable(e) => {
                error!(error = %e, "storage failure");
                "internal server error".to_string()
            }
            AuthError::Hashing(e) => {
                error!(error = %e, "password hashing failure");
                "internal server error".to_string()
            }
            AuthError::Internal(e) => {
                error!(error = %e, "internal failure");
                "internal server error".to_string()
            }
            AuthError::InvalidToken | AuthError::ExpiredToken => "invalid or expired token".into(),
            other => other.to_string(),
        };
        let failed_rules = match &self {
            AuthError::WeakPassword(rules) => rules.clone(),
            _ => Vec::new(),
        };
        let body = ErrorBody {
            code: self.code(),
            message,
            failed_rules,
        };
        (status, Json(body)).into_response()
    }
}
