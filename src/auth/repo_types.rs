use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2, never exposed in JSON
    pub email_confirmed: bool,
    pub two_factor_enabled: bool,
    pub created_at: OffsetDateTime,
}

impl User {
    /// Fresh record with flags at their defaults and a new id.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            email_confirmed: false,
            two_factor_enabled: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
