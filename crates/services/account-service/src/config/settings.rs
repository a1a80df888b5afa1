//! Service settings loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use common::{env_flag, env_or, CacheConfig, DatabaseConfig};
use domain::{DEFAULT_MAX_PASSWORD_LENGTH, DEFAULT_MIN_PASSWORD_LENGTH};

use super::constants::{
    DEFAULT_LIST_RETRIES, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT, DEFAULT_SESSION_COOKIE,
    DEFAULT_SESSION_TTL_MINUTES, DEFAULT_STORE_TIMEOUT_MS,
};
use crate::credential::PasswordPolicy;

/// How a request token maps to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Opaque random token looked up in the session store
    Table,
    /// The token is the account id itself. Compatibility only.
    Legacy,
}

impl FromStr for SessionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(SessionMode::Table),
            "legacy" => Ok(SessionMode::Legacy),
            other => Err(format!("unknown session mode '{}'", other)),
        }
    }
}

/// Where table-mode sessions are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    Redis,
    Memory,
}

impl FromStr for SessionBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(SessionBackend::Redis),
            "memory" => Ok(SessionBackend::Memory),
            other => Err(format!("unknown session backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub mode: SessionMode,
    pub backend: SessionBackend,
    pub cookie_name: String,
    pub ttl: chrono::Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            mode: SessionMode::Table,
            backend: SessionBackend::Redis,
            cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            ttl: chrono::Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
        }
    }
}

/// Account service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub server_host: String,
    pub server_port: u16,
    /// Whether the authority gate enforces permissions. Fixed for the
    /// lifetime of the process.
    pub authority_enabled: bool,
    pub session: SessionSettings,
    pub password: PasswordPolicy,
    /// Bound on a single store call
    pub store_timeout: Duration,
    /// Automatic retries for List on transient failures
    pub list_retries: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = DatabaseConfig::default();
        let database = DatabaseConfig {
            url: env::var("ACCOUNT_SERVICE_DATABASE_URL")
                .or_else(|_| env::var("DATABASE_URL"))
                .unwrap_or(defaults.url),
            max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: env_or("DB_MIN_CONNECTIONS", defaults.min_connections),
            connect_timeout_ms: env_or("DB_CONNECT_TIMEOUT_MS", defaults.connect_timeout_ms),
        };

        let cache = CacheConfig {
            url: env::var("ACCOUNT_SERVICE_REDIS_URL")
                .or_else(|_| env::var("REDIS_URL"))
                .unwrap_or_else(|_| CacheConfig::default().url),
        };

        let session = SessionSettings {
            mode: parse_or_default("SESSION_MODE", SessionMode::Table),
            backend: parse_or_default("SESSION_BACKEND", SessionBackend::Redis),
            cookie_name: env::var("SESSION_COOKIE")
                .ok()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string()),
            ttl: chrono::Duration::minutes(
                env_or("SESSION_TTL_MINUTES", DEFAULT_SESSION_TTL_MINUTES).max(1),
            ),
        };

        let password = PasswordPolicy {
            min_length: env_or("PASSWORD_MIN_LENGTH", DEFAULT_MIN_PASSWORD_LENGTH).max(1),
            max_length: env_or("PASSWORD_MAX_LENGTH", DEFAULT_MAX_PASSWORD_LENGTH),
            forbid_reuse: env_flag("PASSWORD_FORBID_REUSE", false),
        };

        Self {
            database,
            cache,
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            server_port: env_or("SERVER_PORT", DEFAULT_SERVER_PORT),
            authority_enabled: env_flag("AUTHORITY_ENABLED", true),
            session,
            password,
            store_timeout: Duration::from_millis(env_or(
                "STORE_TIMEOUT_MS",
                DEFAULT_STORE_TIMEOUT_MS,
            )),
            list_retries: env_or("LIST_RETRIES", DEFAULT_LIST_RETRIES),
        }
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            authority_enabled: true,
            session: SessionSettings::default(),
            password: PasswordPolicy::default(),
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            list_retries: DEFAULT_LIST_RETRIES,
        }
    }
}

fn parse_or_default<T: FromStr<Err = String>>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|err| {
            tracing::warn!(variable = name, "{}; using default", err);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_enums_parse_case_insensitively() {
        assert_eq!("Legacy".parse::<SessionMode>().unwrap(), SessionMode::Legacy);
        assert_eq!(" memory ".parse::<SessionBackend>().unwrap(), SessionBackend::Memory);
        assert!("cookie".parse::<SessionMode>().is_err());
    }

    #[test]
    fn defaults_enforce_authority() {
        let config = Config::default();
        assert!(config.authority_enabled);
        assert_eq!(config.session.mode, SessionMode::Table);
        assert_eq!(config.password.min_length, DEFAULT_MIN_PASSWORD_LENGTH);
        assert_eq!(config.server_addr(), "0.0.0.0:3000");
    }
}
