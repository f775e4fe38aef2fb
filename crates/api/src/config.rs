//! Process configuration, read once at startup.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;
use tracing::warn;

use schoolmart_admin::BootstrapConfig;
use schoolmart_auth::TokenConfig;

const DEV_JWT_SECRET: &str = "dev-secret";
const DEV_ROOT_PASSWORD: &str = "password123";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not valid: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Postgres connection string; in-memory stores when unset.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_expire_hours: i64,
    pub audit_queue_capacity: usize,
    pub root_admin_username: String,
    pub root_admin_password: String,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });
        let root_admin_password = var("ROOT_ADMIN_PASSWORD").unwrap_or_else(|| {
            warn!("ROOT_ADMIN_PASSWORD not set; seeding the well-known dev password");
            DEV_ROOT_PASSWORD.to_string()
        });

        Ok(Self {
            bind_addr: parse_var(&var, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            database_url: var("DATABASE_URL"),
            database_max_connections: parse_var(&var, "DATABASE_MAX_CONNECTIONS", 10)?,
            jwt_secret,
            jwt_issuer: var("JWT_ISSUER").unwrap_or_else(|| "schoolmart".to_string()),
            jwt_expire_hours: parse_var(&var, "JWT_EXPIRE_HOURS", 24)?,
            audit_queue_capacity: parse_var(&var, "AUDIT_QUEUE_CAPACITY", 1024)?,
            root_admin_username: var("ROOT_ADMIN_USERNAME").unwrap_or_else(|| "platform_admin".to_string()),
            root_admin_password,
        })
    }

    /// In-memory configuration with a fixed secret and the dev root account.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: None,
            database_max_connections: 1,
            jwt_secret: jwt_secret.to_string(),
            jwt_issuer: "schoolmart".to_string(),
            jwt_expire_hours: 24,
            audit_queue_capacity: 1024,
            root_admin_username: "platform_admin".to_string(),
            root_admin_password: DEV_ROOT_PASSWORD.to_string(),
        }
    }

    pub fn token_config(&self) -> TokenConfig {
        TokenConfig::new(
            self.jwt_secret.as_bytes().to_vec(),
            self.jwt_issuer.clone(),
            Duration::hours(self.jwt_expire_hours),
        )
    }

    pub fn bootstrap_config(&self) -> BootstrapConfig {
        BootstrapConfig {
            root_username: self.root_admin_username.clone(),
            root_password: self.root_admin_password.clone(),
        }
    }
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("database_max_connections", &self.database_max_connections)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_expire_hours", &self.jwt_expire_hours)
            .field("audit_queue_capacity", &self.audit_queue_capacity)
            .field("root_admin_username", &self.root_admin_username)
            .field("root_admin_password", &"<redacted>")
            .finish()
    }
}

fn invalid(name: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
    }
}

fn parse_var<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        Some(raw) => raw.trim().parse().map_err(|_| invalid(name, &raw)),
        None => Ok(default),
    }
}
