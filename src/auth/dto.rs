use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::User;
use super::services::TokenPair;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Body of `POST /manage/info`. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct ManageInfoRequest {
    pub new_email: Option<String>,
    pub new_password: Option<String>,
    pub old_password: Option<String>,
}

/// Returned by login and refresh.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64, // seconds
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            token_type: "Bearer".into(),
            expires_in: (pair.access.expires_at - pair.access.issued_at).whole_seconds(),
            expires_at: pair.access.expires_at,
            access_token: pair.access.token,
            refresh_token: pair.refresh.token,
        }
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub email_confirmed: bool,
    pub two_factor_enabled: bool,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            email_confirmed: user.email_confirmed,
            two_factor_enabled: user.two_factor_enabled,
        }
    }
}
