use tracing::{debug, info, warn};
use uuid::Uuid;

use super::claims::TokenKind;
use super::error::AuthError;
use super::jwt::{IssuedToken, JwtKeys};
use super::password::{hash_password, verify_password};
use super::repo_types::User;
use super::store::CredentialStore;

/// Progress of a single login call. Nothing is persisted between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Pending,
    Validated,
    TokenIssued,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Validates credentials against the store and issues or checks bearer tokens.
#[derive(Clone)]
pub struct AuthEngine {
    store: CredentialStore,
    keys: JwtKeys,
    // Verified against when the username is unknown, so both failure paths cost one argon2 run.
    dummy_hash: String,
}

impl AuthEngine {
    pub fn new(store: CredentialStore, keys: JwtKeys) -> anyhow::Result<Self> {
        let dummy_hash = hash_password("dummy-password-for-timing")?;
        Ok(Self {
            store,
            keys,
            dummy_hash,
        })
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let user = self.store.create_user(username, email, password).await?;
        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Unknown user and wrong password both end in `InvalidCredentials`.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        debug!(state = ?LoginState::Pending, username = %username, "login attempt");

        let user = match self.store.find_by_username(username).await? {
            Some(user) if self.store.verify_password(&user, password)? => user,
            Some(user) => {
                warn!(state = ?LoginState::Rejected, user_id = %user.id, "login invalid password");
                return Err(AuthError::InvalidCredentials);
            }
            None => {
                let _ = verify_password(password, &self.dummy_hash);
                warn!(state = ?LoginState::Rejected, username = %username, "login unknown username");
                return Err(AuthError::InvalidCredentials);
            }
        };
        debug!(state = ?LoginState::Validated, user_id = %user.id, "credentials accepted");

        let pair = self.issue_pair(user.id)?;
        info!(state = ?LoginState::TokenIssued, user_id = %user.id, "user logged in");
        Ok(pair)
    }

    /// Resolves an access token to the user it was issued for.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.keys.verify_kind(token, TokenKind::Access)?;
        self.store.find_by_id(claims.sub).await?.ok_or_else(|| {
            warn!(user_id = %claims.sub, "token subject no longer exists");
            AuthError::InvalidToken
        })
    }

    /// Exchanges a refresh token for a new pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.keys.verify_kind(refresh_token, TokenKind::Refresh)?;
        let user = self
            .store
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        let pair = self.issue_pair(user.id)?;
        info!(user_id = %user.id, "tokens refreshed");
        Ok(pair)
    }

    /// Applies an email and/or password change for an authenticated user and
    /// persists both in one write. A new password requires the current one.
    pub async fn update_info(
        &self,
        mut user: User,
        new_email: Option<&str>,
        new_password: Option<&str>,
        old_password: Option<&str>,
    ) -> Result<User, AuthError> {
        if new_email.is_none() && new_password.is_none() {
            return Ok(user);
        }
        if let Some(new_password) = new_password {
            let old_password = old_password.ok_or_else(|| {
                AuthError::InvalidRequest("old_password is required to change the password".into())
            })?;
            self.store.change_password(&mut user, old_password, new_password)?;
        }
        if let Some(new_email) = new_email {
            self.store.change_email(&mut user, new_email)?;
        }
        self.store.update_user(&user).await?;
        info!(
            user_id = %user.id,
            email_changed = new_email.is_some(),
            password_changed = new_password.is_some(),
            "account info updated"
        );
        Ok(user)
    }

    pub async fn reset_schema(&self) -> Result<(), AuthError> {
        self.store.reset_schema().await?;
        warn!("schema dropped and recreated");
        Ok(())
    }

    fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access: self.keys.sign_access(user_id)?,
            refresh: self.keys.sign_refresh(user_id)?,
        })
    }
}
