use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use super::error::AuthError;
use super::password::{hash_password, verify_password};
use super::policy::{is_valid_email, PasswordPolicy, UserPolicy};
use super::repo::UserRepository;
use super::repo_types::User;

/// Owns user records: validates and hashes on the way in, verifies on the way out.
#[derive(Clone)]
pub struct CredentialStore {
    repo: Arc<dyn UserRepository>,
    password_policy: PasswordPolicy,
    user_policy: UserPolicy,
}

impl CredentialStore {
    pub fn new(
        repo: Arc<dyn UserRepository>,
        password_policy: PasswordPolicy,
        user_policy: UserPolicy,
    ) -> Self {
        Self {
            repo,
            password_policy,
            user_policy,
        }
    }

    /// Validation runs before anything is written; the insert itself is one statement.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        if !self.user_policy.is_valid_username(username) {
            warn!(username = %username, "username rejected by policy");
            return Err(AuthError::InvalidUsername);
        }

        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AuthError::InvalidEmail);
        }

        let failed = self.password_policy.check(password);
        if !failed.is_empty() {
            warn!(?failed, "password rejected by policy");
            return Err(AuthError::WeakPassword(failed));
        }

        let hash = hash_password(password)?;
        let user = self
            .repo
            .insert(User::new(username.to_string(), email, hash))
            .await?;
        debug!(user_id = %user.id, "user row created");
        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        self.repo.find_by_username(username).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        self.repo.find_by_id(id).await
    }

    pub fn verify_password(&self, user: &User, candidate: &str) -> Result<bool, AuthError> {
        verify_password(candidate, &user.password_hash)
    }

    /// Replaces the address in memory only; `update_user` persists it.
    /// A changed address is no longer confirmed.
    pub fn change_email(&self, user: &mut User, new_email: &str) -> Result<(), AuthError> {
        let email = new_email.trim().to_lowercase();
        if !is_valid_email(&email) {
            warn!(user_id = %user.id, email = %email, "invalid email");
            return Err(AuthError::InvalidEmail);
        }
        if email != user.email {
            user.email = email;
            user.email_confirmed = false;
        }
        Ok(())
    }

    /// Checks the current password, then applies the policy to the new one.
    pub fn change_password(
        &self,
        user: &mut User,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if !self.verify_password(user, old_password)? {
            warn!(user_id = %user.id, "password change with wrong current password");
            return Err(AuthError::InvalidCredentials);
        }

        let failed = self.password_policy.check(new_password);
        if !failed.is_empty() {
            warn!(user_id = %user.id, ?failed, "password rejected by policy");
            return Err(AuthError::WeakPassword(failed));
        }

        user.password_hash = hash_password(new_password)?;
        Ok(())
    }

    /// Persists email, hash and flags. A user deleted underneath us surfaces as `InvalidToken`,
    /// since the only callers act on behalf of an authenticated subject.
    pub async fn update_user(&self, user: &User) -> Result<(), AuthError> {
        if self.repo.update_credentials(user).await? {
            Ok(())
        } else {
            warn!(user_id = %user.id, "update for missing user");
            Err(AuthError::InvalidToken)
        }
    }

    pub async fn reset_schema(&self) -> Result<(), AuthError> {
        self.repo.reset_schema().await
    }
}
