use std::{fmt::Display, str::FromStr};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

const DEFAULT_SECRET: &str = "dev_secret";

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    pub fn from_source<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let database = DatabaseConfig {
            host: text("MYSQL_HOST", "localhost"),
            port: parsed(&get, "MYSQL_PORT", 3306)?,
            user: text("MYSQL_USER", "wefit_user"),
            password: text("MYSQL_PASSWORD", "wefit_pass"),
            database: text("MYSQL_DATABASE", "wefit_db"),
            pool_size: parsed(&get, "DB_POOL_SIZE", 5)?,
        };
        anyhow::ensure!(database.pool_size > 0, "DB_POOL_SIZE must be positive");

        let secret = get("SECRET_KEY").unwrap_or_else(|| {
            warn!("SECRET_KEY not set; using the development secret");
            DEFAULT_SECRET.to_string()
        });
        let session = SessionConfig {
            secret,
            issuer: text("SESSION_ISSUER", "wefit"),
            audience: text("SESSION_AUDIENCE", "wefit-web"),
            ttl_minutes: parsed(&get, "SESSION_TTL_MINUTES", 60 * 12)?,
        };

        Ok(Self {
            host: text("APP_HOST", "0.0.0.0"),
            port: parsed(&get, "APP_PORT", 8080)?,
            database,
            session,
        })
    }
}

fn parsed<T, F>(get: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("invalid {key} value {raw:?}")),
        None => Ok(default),
    }
}
