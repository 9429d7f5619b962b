//! Service configuration
//!
//! Values come from built-in defaults, then the optional `config/stash.toml`,
//! then `STASH__*` environment variables (e.g. `STASH__DATABASE__DATABASE_URL`,
//! `STASH__JWT__SECRET`).

use common::{cache::RedisConfig, database::DatabaseConfig};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const CONFIG_FILE: &str = "config/stash";
const ENV_PREFIX: &str = "STASH";
const DEV_SECRET: &str = "stash-keeper-development-secret";

/// Top-level configuration of the API service
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    /// Token revocation is disabled when Redis is not configured
    pub redis: Option<RedisConfig>,
    pub jwt: JwtConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// JWT configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// HMAC secret used to sign and verify tokens
    #[serde(default = "default_secret")]
    pub secret: String,
    /// Access token expiration time in seconds (default: 15 minutes)
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 7 days)
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: u64,
}

fn default_secret() -> String {
    DEV_SECRET.to_string()
}

fn default_access_token_expiry() -> u64 {
    900
}

fn default_refresh_token_expiry() -> u64 {
    604800
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            access_token_expiry: default_access_token_expiry(),
            refresh_token_expiry: default_refresh_token_expiry(),
        }
    }
}

impl JwtConfig {
    pub fn uses_development_secret(&self) -> bool {
        self.secret == DEV_SECRET
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load the configuration from `config/stash.toml` and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.trim().is_empty() {
            return Err(ConfigError::Message("jwt.secret must not be empty".into()));
        }
        if self.jwt.access_token_expiry == 0 || self.jwt.refresh_token_expiry == 0 {
            return Err(ConfigError::Message("token expiry must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use serial_test::serial;

    #[test]
    fn defaults_apply_without_sources() {
        let config: AppConfig = Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.server.bind_addr(), "0.0.0.0:3001");
        assert_eq!(config.jwt.access_token_expiry, 900);
        assert!(config.redis.is_none());
        assert!(config.jwt.uses_development_secret());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_values_override_defaults() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(
                r#"
                [server]
                port = 8080

                [redis]
                url = "redis://cache:6379"

                [jwt]
                secret = "s3cret"
                "#,
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        let redis = config.redis.unwrap();
        assert_eq!(redis.url, "redis://cache:6379");
        assert_eq!(redis.key_prefix, "stash");
        assert_eq!(config.jwt.secret, "s3cret");
    }

    #[test]
    #[serial]
    fn environment_overrides_file() {
        unsafe { std::env::set_var("STASH__LOG__LEVEL", "debug") };
        let config = AppConfig::load().unwrap();
        unsafe { std::env::remove_var("STASH__LOG__LEVEL") };
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn empty_secret_is_rejected() {
        let mut config = AppConfig::default();
        config.jwt.secret = "  ".into();
        assert!(config.validate().is_err());
    }
}
