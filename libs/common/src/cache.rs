//! Redis cache module
//!
//! Holds short-lived flags (revoked refresh tokens) that must outlive a
//! single process but expire on their own.

use anyhow::Result;
use redis::{AsyncCommands, Client};
use serde::Deserialize;
use tracing::info;

/// Configuration for Redis connection
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
    /// Prefix applied to every key written by this service
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_key_prefix() -> String {
    "stash".to_string()
}

/// Redis connection pool
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
    key_prefix: String,
}

impl RedisPool {
    /// Initialize a new Redis client; no connection is opened until first use
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.clone())?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool {
            client,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn key(&self, namespace: &str, key: &str) -> String {
        format!("{}:{}:{}", self.key_prefix, namespace, key)
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn)
    }

    /// Set a flag that expires after `ttl_seconds`
    pub async fn set_flag(&self, namespace: &str, key: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let _: () = conn
            .set_ex(self.key(namespace, key), "1", ttl_seconds.max(1))
            .await?;
        Ok(())
    }

    /// Whether a flag is currently set
    pub async fn has_flag(&self, namespace: &str, key: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let exists: bool = conn.exists(self.key(namespace, key)).await?;
        Ok(exists)
    }

    /// Remove a flag
    pub async fn clear_flag(&self, namespace: &str, key: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let _: u64 = conn.del(self.key(namespace, key)).await?;
        Ok(())
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        let pool = RedisPool::new(&RedisConfig {
            url: "redis://localhost:6379".to_string(),
            key_prefix: default_key_prefix(),
        })
        .unwrap();
        assert_eq!(pool.key("revoked", "abc"), "stash:revoked:abc");
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_flag_lifecycle() -> Result<()> {
        let pool = RedisPool::new(&RedisConfig {
            url: "redis://localhost:6379".to_string(),
            key_prefix: "stash-test".to_string(),
        })?;
        assert!(pool.health_check().await?);

        pool.set_flag("revoked", "token", 5).await?;
        assert!(pool.has_flag("revoked", "token").await?);

        pool.clear_flag("revoked", "token").await?;
        assert!(!pool.has_flag("revoked", "token").await?);
        Ok(())
    }
}
