use std::env;
use std::str::FromStr;

/// Runtime configuration, read once at startup. Every knob has a default so
/// the server comes up with no environment at all.
#[derive(Debug, Clone)]
pub struct Config {
    pub http_addr: String,
    /// Postgres connection string, or the literal `memory` for the
    /// in-process store.
    pub database_url: String,
    /// Maximum age of the latest reading for the device to count as online.
    pub online_window_secs: i64,
    pub history_default_limit: usize,
    pub history_max_limit: usize,
    pub export_default_limit: usize,
    pub export_max_limit: usize,
    pub train_default_limit: usize,
    pub train_max_limit: usize,
    pub token_ttl_secs: i64,
    pub admin_user: String,
    pub admin_pass: String,
    /// Comma-separated allowed origins, or `*`.
    pub cors_origins: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            http_addr: env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "memory".to_string()),
            online_window_secs: parse_env("ONLINE_WINDOW_SECS", 20),
            history_default_limit: parse_env("HISTORY_DEFAULT_LIMIT", 20),
            history_max_limit: parse_env("HISTORY_MAX_LIMIT", 200),
            export_default_limit: parse_env("EXPORT_DEFAULT_LIMIT", 500),
            export_max_limit: parse_env("EXPORT_MAX_LIMIT", 5000),
            train_default_limit: parse_env("TRAIN_DEFAULT_LIMIT", 1500),
            train_max_limit: parse_env("TRAIN_MAX_LIMIT", 2000),
            token_ttl_secs: parse_env("TOKEN_TTL_SECS", 12 * 60 * 60),
            admin_user: env::var("ADMIN_USER").unwrap_or_else(|_| "admin".to_string()),
            admin_pass: env::var("ADMIN_PASS").unwrap_or_else(|_| "123456".to_string()),
            cors_origins: env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()),
        }
    }
}

fn parse_env<T: FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
