//! Configuration management
//!
//! This module handles loading and parsing configuration for the SafraReport
//! editorial backend. Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Session configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Login throttling
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Newsroom policy knobs for the review workflow
    #[serde(default)]
    pub editorial: EditorialConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (the newsroom frontend)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Take the client address from X-Forwarded-For / X-Real-IP.
    /// Only enable behind a reverse proxy that overwrites those headers.
    #[serde(default)]
    pub trust_proxy: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            trust_proxy: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or postgres)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/safra_report.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default, single-binary deployments and tests)
    #[default]
    Sqlite,
    /// PostgreSQL (production)
    Postgres,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached entries
    #[serde(default = "default_cache_capacity")]
    pub capacity: u64,
    /// Upper bound on entry lifetime in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_cache_capacity() -> u64 {
    10_000
}

fn default_ttl() -> u64 {
    3600
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Lifetime of a bearer session
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: default_session_ttl_hours(),
        }
    }
}

fn default_session_ttl_hours() -> i64 {
    24 * 7
}

/// Login throttling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Failed attempts allowed per username inside the window
    #[serde(default = "default_login_attempts")]
    pub login_attempts: usize,
    #[serde(default = "default_login_window_secs")]
    pub login_window_secs: i64,
    /// Login requests allowed per IP inside the window
    #[serde(default = "default_ip_requests")]
    pub ip_requests: usize,
    #[serde(default = "default_ip_window_secs")]
    pub ip_window_secs: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login_attempts: default_login_attempts(),
            login_window_secs: default_login_window_secs(),
            ip_requests: default_ip_requests(),
            ip_window_secs: default_ip_window_secs(),
        }
    }
}

fn default_login_attempts() -> usize {
    5
}

fn default_login_window_secs() -> i64 {
    15 * 60
}

fn default_ip_requests() -> usize {
    10
}

fn default_ip_window_secs() -> i64 {
    60
}

/// Editorial policy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorialConfig {
    /// Editors may approve, reject or request changes on their own articles
    #[serde(default)]
    pub allow_self_review: bool,
    /// Articles must be approved before they can be published
    #[serde(default = "default_true")]
    pub require_approval_before_publish: bool,
    /// Publishing fails while the article has unresolved editorial comments
    #[serde(default)]
    pub block_publish_with_open_comments: bool,
    /// Oldest versions beyond this count are pruned
    #[serde(default = "default_max_versions")]
    pub max_versions_per_article: i64,
}

impl Default for EditorialConfig {
    fn default() -> Self {
        Self {
            allow_self_review: false,
            require_approval_before_publish: true,
            block_publish_with_open_comments: false,
            max_versions_per_article: default_max_versions(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_versions() -> i64 {
    50
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist or is empty, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with the
    /// line and column of the problem.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - SAFRA_SERVER_HOST / SAFRA_SERVER_PORT / SAFRA_SERVER_CORS_ORIGIN
    /// - SAFRA_TRUST_PROXY
    /// - SAFRA_DATABASE_DRIVER / SAFRA_DATABASE_URL
    /// - SAFRA_CACHE_TTL_SECONDS
    /// - SAFRA_AUTH_SESSION_TTL_HOURS
    /// - SAFRA_EDITORIAL_ALLOW_SELF_REVIEW
    /// - SAFRA_EDITORIAL_REQUIRE_APPROVAL
    /// - SAFRA_EDITORIAL_BLOCK_OPEN_COMMENTS
    /// - SAFRA_EDITORIAL_MAX_VERSIONS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.editorial.max_versions_per_article < 1 {
            return Err(ConfigError::ValidationError(
                "editorial.max_versions_per_article must be at least 1".to_string(),
            ));
        }
        if self.auth.session_ttl_hours < 1 {
            return Err(ConfigError::ValidationError(
                "auth.session_ttl_hours must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("SAFRA_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("SAFRA_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(cors_origin) = std::env::var("SAFRA_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }
        if let Some(trust_proxy) = env_parse::<bool>("SAFRA_TRUST_PROXY") {
            self.server.trust_proxy = trust_proxy;
        }

        if let Ok(driver) = std::env::var("SAFRA_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "postgres" | "postgresql" => self.database.driver = DatabaseDriver::Postgres,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("SAFRA_DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(ttl) = env_parse::<u64>("SAFRA_CACHE_TTL_SECONDS") {
            self.cache.ttl_seconds = ttl;
        }
        if let Some(hours) = env_parse::<i64>("SAFRA_AUTH_SESSION_TTL_HOURS") {
            self.auth.session_ttl_hours = hours;
        }

        if let Some(flag) = env_parse::<bool>("SAFRA_EDITORIAL_ALLOW_SELF_REVIEW") {
            self.editorial.allow_self_review = flag;
        }
        if let Some(flag) = env_parse::<bool>("SAFRA_EDITORIAL_REQUIRE_APPROVAL") {
            self.editorial.require_approval_before_publish = flag;
        }
        if let Some(flag) = env_parse::<bool>("SAFRA_EDITORIAL_BLOCK_OPEN_COMMENTS") {
            self.editorial.block_publish_with_open_comments = flag;
        }
        if let Some(max) = env_parse::<i64>("SAFRA_EDITORIAL_MAX_VERSIONS") {
            self.editorial.max_versions_per_article = max;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches SAFRA_* variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn editorial_strategy() -> impl Strategy<Value = EditorialConfig> {
        (any::<bool>(), any::<bool>(), any::<bool>(), 1i64..500).prop_map(
            |(allow_self_review, require_approval, block_open, max_versions)| EditorialConfig {
                allow_self_review,
                require_approval_before_publish: require_approval,
                block_publish_with_open_comments: block_open,
                max_versions_per_article: max_versions,
            },
        )
    }

    fn config_strategy() -> impl Strategy<Value = Config> {
        (
            "[a-z][a-z0-9]{0,10}",
            1u16..=65535,
            prop_oneof![Just(DatabaseDriver::Sqlite), Just(DatabaseDriver::Postgres)],
            "[a-z][a-z0-9_/]{0,20}\\.db",
            1u64..100_000,
            editorial_strategy(),
        )
            .prop_map(|(host, port, driver, url, ttl, editorial)| Config {
                server: ServerConfig {
                    host,
                    port,
                    ..ServerConfig::default()
                },
                database: DatabaseConfig { driver, url },
                cache: CacheConfig {
                    capacity: default_cache_capacity(),
                    ttl_seconds: ttl,
                },
                auth: AuthConfig::default(),
                rate_limit: RateLimitConfig::default(),
                editorial,
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn config_yaml_roundtrip(config in config_strategy()) {
            let yaml = serde_yaml::to_string(&config).expect("Failed to serialize config");
            let mut file = NamedTempFile::new().expect("Failed to create temp file");
            write!(file, "{}", yaml).expect("Failed to write config");

            let parsed = Config::load(file.path()).expect("Failed to parse config");

            prop_assert_eq!(config.server.host, parsed.server.host);
            prop_assert_eq!(config.server.port, parsed.server.port);
            prop_assert_eq!(config.database.driver, parsed.database.driver);
            prop_assert_eq!(config.database.url, parsed.database.url);
            prop_assert_eq!(config.cache.ttl_seconds, parsed.cache.ttl_seconds);
            prop_assert_eq!(config.editorial, parsed.editorial);
        }
    }
}
