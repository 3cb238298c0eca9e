use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::{
    jwt::JwtKeys, repo::SqliteUserRepository, services::AuthEngine, store::CredentialStore,
};
use crate::config::AppConfig;
use crate::db;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub engine: Arc<AuthEngine>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let db = db::connect(&config.database_url).await?;
        Self::from_parts(db, config)
    }

    /// Wires store, keys and engine around an existing pool.
    pub fn from_parts(db: SqlitePool, config: AppConfig) -> anyhow::Result<Self> {
        let store = CredentialStore::new(
            Arc::new(SqliteUserRepository::new(db.clone())),
            config.password.clone(),
            config.user.clone(),
        );
        let keys = JwtKeys::from_config(&config.jwt);
        let engine = Arc::new(AuthEngine::new(store, keys)?);
        Ok(Self {
            db,
            config: Arc::new(config),
            engine,
        })
    }
}
