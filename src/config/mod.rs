use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub db: DbConfig,
    pub session_ttl_hours: u64,
    pub suspension_default_days: i64,
}

/// Connection pool settings, grouped so `Db::connect` takes one value.
#[derive(Clone, Debug)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        Ok(Self {
            http_addr,
            db: DbConfig {
                url: env_or_err("DATABASE_URL")?,
                max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
                acquire_timeout: Duration::from_secs(env_or_parse(
                    "DB_CONNECT_TIMEOUT_SECONDS",
                    "5",
                )?),
                idle_timeout: Duration::from_secs(env_or_parse(
                    "DB_IDLE_TIMEOUT_SECONDS",
                    "300",
                )?),
                max_lifetime: Duration::from_secs(env_or_parse(
                    "DB_MAX_LIFETIME_SECONDS",
                    "1800",
                )?),
            },
            session_ttl_hours: env_or_parse("SESSION_TTL_HOURS", "168")?,
            suspension_default_days: env_or_parse("SUSPENSION_DEFAULT_DAYS", "7")?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}
