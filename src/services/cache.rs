//! Redis-backed storage for AI pricing research.
//!
//! Values are JSON encoded under the `ai:pricing:` prefix. Redis expiry is set
//! to the retention window so abandoned keys age out; freshness on read is
//! still decided by `PricingCache` from the entry's `last_updated`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use super::pricing_cache::PricingStore;
use crate::domain::ai::AiPricingData;

/// Redis cache client with connection pooling.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    default_ttl: Duration,
}

impl RedisCache {
    /// Create a new Redis cache connection.
    pub async fn new(redis_url: &str, retention_days: i64) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        tracing::info!(retention_days, "Redis pricing cache connected");

        Ok(Self {
            conn,
            default_ttl: Duration::from_secs(retention_days.max(1) as u64 * 86_400),
        })
    }

    /// Get a value from cache.
    #[instrument(skip(self), fields(cache_hit))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.conn.clone();

        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(data)) => match serde_json::from_str(&data) {
                Ok(value) => {
                    debug!(key = key, "Cache hit");
                    tracing::Span::current().record("cache_hit", true);
                    Some(value)
                }
                Err(e) => {
                    warn!(key = key, error = %e, "Failed to deserialize cached value");
                    tracing::Span::current().record("cache_hit", false);
                    None
                }
            },
            Ok(None) => {
                debug!(key = key, "Cache miss");
                tracing::Span::current().record("cache_hit", false);
                None
            }
            Err(e) => {
                error!(key = key, error = %e, "Redis get error");
                tracing::Span::current().record("cache_hit", false);
                None
            }
        }
    }

    /// Set a value in cache with the retention TTL.
    #[instrument(skip(self, value))]
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let mut conn = self.conn.clone();

        let data = serde_json::to_string(value).context("Failed to serialize value for cache")?;

        conn.set_ex::<_, _, ()>(key, data, self.default_ttl.as_secs())
            .await
            .context("Failed to set cache value")?;

        debug!(key = key, ttl_secs = self.default_ttl.as_secs(), "Cached value");
        Ok(())
    }

    /// Check if Redis is healthy.
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("Redis health check failed")?;
        Ok(())
    }
}

#[async_trait]
impl PricingStore for RedisCache {
    async fn load(&self, key: &str) -> Option<AiPricingData> {
        self.get(&keys::ai_pricing(key)).await
    }

    async fn store(&self, key: &str, data: &AiPricingData) -> Result<()> {
        self.set(&keys::ai_pricing(key), data).await
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn health_check(&self) -> Result<()> {
        RedisCache::health_check(self).await
    }
}

/// Cache key builders for consistent key formats.
pub mod keys {
    /// AI pricing research entry for a normalized research key
    pub fn ai_pricing(research_key: &str) -> String {
        format!("ai:pricing:{}", research_key)
    }
}

#[cfg(test)]
mod tests {
    use super::keys;

    #[test]
    fn pricing_keys_are_namespaced() {
        assert_eq!(
            keys::ai_pricing("repair-denver-fix-outlet"),
            "ai:pricing:repair-denver-fix-outlet"
        );
    }
}
