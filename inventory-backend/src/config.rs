use std::env::var;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;

/// Deployment mode, drives CORS and HSTS.
/// Env: APP_ENV (default: development)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnv {
    #[default]
    Development,
    Staging,
    Production,
}

impl AppEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnv::Development => "development",
            AppEnv::Staging => "staging",
            AppEnv::Production => "production",
        }
    }
}

impl FromStr for AppEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnv::Development),
            "staging" | "alpha" => Ok(AppEnv::Staging),
            "production" | "prod" => Ok(AppEnv::Production),
            other => Err(format!("unknown APP_ENV: {other}")),
        }
    }
}

impl fmt::Display for AppEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: AppEnv,

    /// Server port
    /// Env: PORT (default: 8080)
    pub port: u16,

    /// Database file path
    /// Env: DATABASE_PATH (default: "inventory.db")
    pub database_path: String,

    /// Token signing secret
    /// Env: JWT_SECRET (default: random per process, tokens die on restart)
    pub jwt_secret: String,

    /// Token lifetime
    /// Env: JWT_EXPIRATION_HOURS (default: 24)
    pub jwt_expiration: Duration,

    /// Request body size limit in bytes
    /// Env: REQUEST_BODY_LIMIT (default: 1048576 = 1MB)
    pub request_body_limit: usize,

    /// Request timeout in seconds
    /// Env: REQUEST_TIMEOUT_SECS (default: 30)
    pub request_timeout: Duration,

    /// Explicit CORS allow list, replaces the per-mode defaults
    /// Env: ALLOWED_ORIGINS (comma separated)
    pub allowed_origins: Option<Vec<String>>,

    /// Extra origins appended in production
    /// Env: CUSTOM_DOMAINS (comma separated)
    pub custom_domains: Vec<String>,

    /// Extra origins appended in staging
    /// Env: PREVIEW_DOMAINS (comma separated)
    pub preview_domains: Vec<String>,

    /// Development only: accept any origin, without credentials
    /// Env: CORS_ALLOW_ALL (default: false)
    pub cors_allow_all: bool,

    /// Seconds to replenish one auth request slot per client IP
    /// Env: RATE_LIMIT_AUTH_PERIOD_SECS (default: 1)
    pub rate_limit_auth_period_secs: u64,

    /// Burst size for /api/auth endpoints
    /// Env: RATE_LIMIT_AUTH_BURST (default: 10)
    pub rate_limit_auth_burst: u32,

    /// Key the auth rate limit on X-Forwarded-For / X-Real-IP instead of the
    /// peer address. Only enable behind a proxy that overwrites those headers.
    /// Env: TRUST_PROXY_HEADERS (default: false)
    pub trust_proxy_headers: bool,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenv(); //for local runs mostly
        let defaults = Self::default();

        let app_env = match var("APP_ENV") {
            Ok(raw) => raw.parse().unwrap_or_else(|err| {
                tracing::warn!("{err}, falling back to development");
                AppEnv::Development
            }),
            Err(_) => AppEnv::Development,
        };

        let jwt_secret = match var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!("JWT_SECRET not set, using a random secret for this process");
                defaults.jwt_secret
            }
        };

        Self {
            app_env,
            port: env_or_default("PORT", defaults.port),
            database_path: env_or_default_string("DATABASE_PATH", &defaults.database_path),
            jwt_secret,
            jwt_expiration: Duration::from_secs(
                env_or_default("JWT_EXPIRATION_HOURS", 24u64) * 3600,
            ),
            request_body_limit: env_or_default("REQUEST_BODY_LIMIT", defaults.request_body_limit),
            request_timeout: Duration::from_secs(env_or_default("REQUEST_TIMEOUT_SECS", 30)),
            allowed_origins: var("ALLOWED_ORIGINS")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|v| split_list(&v)),
            custom_domains: env_list("CUSTOM_DOMAINS"),
            preview_domains: env_list("PREVIEW_DOMAINS"),
            cors_allow_all: env_or_default("CORS_ALLOW_ALL", false),
            rate_limit_auth_period_secs: env_or_default(
                "RATE_LIMIT_AUTH_PERIOD_SECS",
                defaults.rate_limit_auth_period_secs,
            ),
            rate_limit_auth_burst: env_or_default(
                "RATE_LIMIT_AUTH_BURST",
                defaults.rate_limit_auth_burst,
            ),
            trust_proxy_headers: env_or_default("TRUST_PROXY_HEADERS", false),
        }
    }
}

impl Default for Config {
    /// Create configuration with all default values
    fn default() -> Self {
        Self {
            app_env: AppEnv::Development,
            port: 8080,
            database_path: "inventory.db".to_string(),
            jwt_secret: crate::helpers::generate_secret(),
            jwt_expiration: Duration::from_secs(24 * 3600),
            request_body_limit: 1024 * 1024, // 1 MB
            request_timeout: Duration::from_secs(30),
            allowed_origins: None,
            custom_domains: Vec::new(),
            preview_domains: Vec::new(),
            cors_allow_all: false,
            rate_limit_auth_period_secs: 1,
            rate_limit_auth_burst: 10,
            trust_proxy_headers: false,
        }
    }
}

/// Parse environment variable or return default value
fn env_or_default<T: FromStr>(key: &str, default: T) -> T {
    var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}

/// Parse environment variable string or return default value
fn env_or_default_string(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|_| default.to_string())
}

fn env_list(key: &str) -> Vec<String> {
    var(key).map(|v| split_list(&v)).unwrap_or_default()
}

/// Split a comma separated list, trimming entries and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.app_env, AppEnv::Development);
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_path, "inventory.db");
        assert_eq!(config.jwt_expiration, Duration::from_secs(86_400));
        assert_eq!(config.jwt_secret.len(), 64);
        assert_eq!(config.request_body_limit, 1024 * 1024);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.allowed_origins.is_none());
        assert!(!config.cors_allow_all);
        assert_eq!(config.rate_limit_auth_period_secs, 1);
        assert_eq!(config.rate_limit_auth_burst, 10);
        assert!(!config.trust_proxy_headers);
    }

    #[test]
    fn test_default_secrets_differ() {
        assert_ne!(Config::default().jwt_secret, Config::default().jwt_secret);
    }

    #[test]
    fn test_app_env_parsing() {
        assert_eq!("production".parse(), Ok(AppEnv::Production));
        assert_eq!("Staging".parse(), Ok(AppEnv::Staging));
        assert_eq!("alpha".parse(), Ok(AppEnv::Staging));
        assert_eq!(" development ".parse(), Ok(AppEnv::Development));
        assert!("qa".parse::<AppEnv>().is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" https://a.example.com, ,https://b.example.com ,"),
            vec!["https://a.example.com", "https://b.example.com"]
        );
        assert!(split_list("").is_empty());
    }
}
