use std::str::FromStr;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Storage backends are optional; without them results stay in process.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub max_concurrent_analyses: usize,
    pub reserved_priority_slots: usize,
    pub cache_ttl_secs: u64,
    pub module_timeout_ms: u64,
    pub audit_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10)?,
            redis_url: optional_env("REDIS_URL"),
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_concurrent_analyses: env_or("MAX_CONCURRENT_ANALYSES", 16)?,
            reserved_priority_slots: env_or("RESERVED_PRIORITY_SLOTS", 1)?,
            cache_ttl_secs: env_or("CACHE_TTL_SECS", 30 * 60)?,
            module_timeout_ms: env_or("MODULE_TIMEOUT_MS", 5_000)?,
            audit_capacity: env_or("AUDIT_CAPACITY", 1_000)?,
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_falls_back_to_default_when_unset() {
        let value: u64 = env_or("ANALYSIS_API_TEST_UNSET_VAR", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_env_or_rejects_unparseable_value() {
        std::env::set_var("ANALYSIS_API_TEST_BAD_PORT", "not-a-port");
        let err = env_or::<u16>("ANALYSIS_API_TEST_BAD_PORT", 8080).unwrap_err();
        assert!(err.to_string().contains("ANALYSIS_API_TEST_BAD_PORT"));
    }
}
