//! Process settings from the environment (`.env` is loaded by the binary first).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_SCHEMA: &str = "public";
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_STATS_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_WS_BUFFER: usize = 256;
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub database_schema: String,
    /// JSON model file served from memory. Used when no database is configured.
    pub models_path: Option<PathBuf>,
    pub fetch_timeout: Duration,
    /// `None` disables the stats ticker.
    pub stats_interval: Option<Duration>,
    pub ws_buffer: usize,
    pub body_limit_bytes: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let stats_secs: u64 = parse_or(get("STATS_INTERVAL_SECS"), "STATS_INTERVAL_SECS", DEFAULT_STATS_INTERVAL_SECS)?;
        let ws_buffer: usize = parse_or(get("WS_BUFFER"), "WS_BUFFER", DEFAULT_WS_BUFFER)?;
        if ws_buffer == 0 {
            return Err(ConfigError::Invalid {
                key: "WS_BUFFER",
                value: "0".into(),
            });
        }
        let database_schema = get("DATABASE_SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.into());
        if !is_identifier(&database_schema) {
            return Err(ConfigError::Invalid {
                key: "DATABASE_SCHEMA",
                value: database_schema,
            });
        }

        Ok(Settings {
            bind_addr: parse_or(get("BIND_ADDR"), "BIND_ADDR", default_bind_addr())?,
            database_url: get("DATABASE_URL"),
            database_schema,
            models_path: get("MODELS_PATH").map(PathBuf::from),
            fetch_timeout: Duration::from_millis(parse_or(
                get("FETCH_TIMEOUT_MS"),
                "FETCH_TIMEOUT_MS",
                DEFAULT_FETCH_TIMEOUT_MS,
            )?),
            stats_interval: (stats_secs > 0).then(|| Duration::from_secs(stats_secs)),
            ws_buffer,
            body_limit_bytes: parse_or(get("BODY_LIMIT_BYTES"), "BODY_LIMIT_BYTES", DEFAULT_BODY_LIMIT_BYTES)?,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bind_addr: default_bind_addr(),
            database_url: None,
            database_schema: DEFAULT_SCHEMA.into(),
            models_path: None,
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            stats_interval: Some(Duration::from_secs(DEFAULT_STATS_INTERVAL_SECS)),
            ws_buffer: DEFAULT_WS_BUFFER,
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid { key, value: v }),
    }
}

/// PostgreSQL identifier: letter or underscore, then letters, digits, underscores.
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
