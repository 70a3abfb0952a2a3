//! API server configuration.

use std::fmt;
use std::time::Duration;

use bazaar_core::auth::jwt::resolve_jwt_secret;
use bazaar_core::auth::{BcryptHasher, DEFAULT_TOKEN_DAYS};
use bazaar_core::store::timeout::DEFAULT_STORE_TIMEOUT;

/// Bootstrap admin account created at startup when no admin holds its email.
#[derive(Clone)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSeed")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Session lifetime in days.
    pub token_days: i64,
    /// Upper bound on any single store call.
    pub store_timeout: Duration,
    /// bcrypt work factor for new password hashes.
    pub bcrypt_cost: u32,
    pub admin_seed: Option<AdminSeed>,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("jwt_secret", &"<redacted>")
            .field("token_days", &self.token_days)
            .field("store_timeout", &self.store_timeout)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("admin_seed", &self.admin_seed)
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3100".into(),
            database_url: None,
            jwt_secret: String::new(),
            token_days: DEFAULT_TOKEN_DAYS,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            bcrypt_cost: BcryptHasher::DEFAULT_COST,
            admin_seed: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                     | Default                          |
    /// |------------------------------|----------------------------------|
    /// | `BIND_ADDR`                  | `127.0.0.1:3100`                 |
    /// | `DATABASE_URL`               | unset (in-memory store)          |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file    |
    /// | `JWT_EXPIRE_DAYS`            | `30`                             |
    /// | `STORE_TIMEOUT_MS`           | `5000`                           |
    /// | `BCRYPT_COST`                | `10`                             |
    /// | `ADMIN_EMAIL` / `ADMIN_PASSWORD` / `ADMIN_NAME` | no seed       |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let admin_seed = match (std::env::var("ADMIN_EMAIL"), std::env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.trim().is_empty() => Some(AdminSeed {
                name: std::env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".into()),
                email,
                password,
            }),
            _ => None,
        };
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            jwt_secret: resolve_jwt_secret(),
            token_days: env_parse("JWT_EXPIRE_DAYS")
                .filter(|days: &i64| *days > 0)
                .unwrap_or(defaults.token_days),
            store_timeout: env_parse("STORE_TIMEOUT_MS")
                .filter(|ms: &u64| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
            bcrypt_cost: env_parse("BCRYPT_COST").unwrap_or(defaults.bcrypt_cost),
            admin_seed,
        }
    }
}
