use std::net::SocketAddr;

use anyhow::Context;
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;

use crate::auth::policy::{PasswordPolicy, UserPolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
    pub leeway_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt: JwtConfig,
    pub password: PasswordPolicy,
    pub user: UserPolicy,
    /// Mounts `/migrate`. Only ever true when `APP_ENV=development`.
    pub dev_endpoints: bool,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = match std::env::var("APP_PORT") {
            Ok(p) => p.parse().with_context(|| format!("APP_PORT is not a port: {p}"))?,
            Err(_) => 8080,
        };
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://accounts.db?mode=rwc".into());

        let secret = match std::env::var("JWT_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                tracing::warn!("JWT_SECRET not set; generated an ephemeral signing secret");
                generate_secret()
            }
        };
        let jwt = JwtConfig {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "account-service".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "account-service-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
            leeway_secs: env_or("JWT_LEEWAY_SECS", 0),
        };

        let defaults = PasswordPolicy::default();
        let password = PasswordPolicy {
            required_length: env_or("PASSWORD_MIN_LENGTH", defaults.required_length),
            required_unique_chars: env_or(
                "PASSWORD_MIN_UNIQUE_CHARS",
                defaults.required_unique_chars,
            ),
            require_digit: env_or("PASSWORD_REQUIRE_DIGIT", defaults.require_digit),
            require_lowercase: env_or("PASSWORD_REQUIRE_LOWERCASE", defaults.require_lowercase),
            require_uppercase: env_or("PASSWORD_REQUIRE_UPPERCASE", defaults.require_uppercase),
            require_non_alphanumeric: env_or(
                "PASSWORD_REQUIRE_NON_ALPHANUMERIC",
                defaults.require_non_alphanumeric,
            ),
        };

        let user = match std::env::var("USERNAME_ALLOWED_CHARS") {
            Ok(chars) if !chars.is_empty() => UserPolicy {
                allowed_username_chars: chars,
            },
            _ => UserPolicy::default(),
        };

        let dev_endpoints = std::env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("development"))
            .unwrap_or(false);

        Ok(Self {
            host,
            port,
            database_url,
            jwt,
            password,
            user,
            dev_endpoints,
        })
    }
}

impl AppConfig {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

/// Random 64-char signing secret, held for the life of the process.
pub fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}
