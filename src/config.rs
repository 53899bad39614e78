//! Application configuration via environment variables.
//!
//! The four upstream settings are required; the process refuses to start
//! without them.

use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub verification_url: String,
    pub api_base_url: String,
    pub api_version: Option<String>,
    /// PEM-encoded RSA public key with `\n` escapes already expanded.
    pub jwt_public_key: String,
    pub port: u16,
    pub frontend_url: String,
    pub login_path: String,
    pub permission_cache_ttl: Duration,
    pub permission_cache_capacity: u64,
    pub id_cache_capacity: u64,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Required: `VERIFICATION_URL`, `API_BASE_URL`, `API_VERSION`, `JWT_PUBLIC_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingEnv(key.into()));

        let api_version = required("API_VERSION")?;
        let api_version = Some(api_version.trim().trim_matches('/').to_string())
            .filter(|v| !v.is_empty());

        Ok(Self {
            verification_url: required("VERIFICATION_URL")?,
            api_base_url: required("API_BASE_URL")?,
            api_version,
            jwt_public_key: unescape_newlines(&required("JWT_PUBLIC_KEY")?),
            port: parse_or(&lookup, "PORT", 3000)?,
            frontend_url: lookup("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".into()),
            login_path: lookup("LOGIN_PATH").unwrap_or_else(|| "/login".into()),
            permission_cache_ttl: Duration::from_secs(parse_or(
                &lookup,
                "PERMISSION_CACHE_TTL_SECS",
                3600,
            )?),
            permission_cache_capacity: parse_or(&lookup, "PERMISSION_CACHE_CAPACITY", 1024)?,
            id_cache_capacity: parse_or(&lookup, "ID_CACHE_CAPACITY", 10_000)?,
        })
    }

    /// Configuration for tests; override fields with struct update syntax.
    pub fn test_default() -> Self {
        Self {
            verification_url: "http://localhost:3000/verify".into(),
            api_base_url: "http://127.0.0.1:9".into(),
            api_version: None,
            jwt_public_key: String::new(),
            port: 3000,
            frontend_url: "http://localhost:3000".into(),
            login_path: "/login".into(),
            permission_cache_ttl: Duration::from_secs(3600),
            permission_cache_capacity: 1024,
            id_cache_capacity: 10_000,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}

/// Keys stored in single-line env vars carry literal `\n` sequences.
fn unescape_newlines(value: &str) -> String {
    value.replace("\\n", "\n")
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.into(),
            value: raw,
        }),
    }
}
