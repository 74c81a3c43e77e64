//! Time-boxed cache of AI pricing research results.
//!
//! Entries are keyed by a normalized `(work type, city, scope)` string and are
//! only served while `now - last_updated` is inside the retention window.
//! Storage and the clock are both injected so the expiry rule can be tested
//! without Redis or wall-clock time.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::domain::ai::AiPricingData;
use crate::domain::estimates::WorkType;

/// Default retention window for cached research.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

const MAX_KEY_LEN: usize = 100;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Raw key-value storage behind the pricing cache.
#[async_trait]
pub trait PricingStore: Send + Sync {
    async fn load(&self, key: &str) -> Option<AiPricingData>;
    async fn store(&self, key: &str, data: &AiPricingData) -> Result<()>;
    fn backend_name(&self) -> &'static str;
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// In-process store.
#[derive(Default)]
pub struct MemoryPricingStore {
    entries: RwLock<HashMap<String, AiPricingData>>,
}

impl MemoryPricingStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl PricingStore for MemoryPricingStore {
    async fn load(&self, key: &str) -> Option<AiPricingData> {
        self.entries.read().get(key).cloned()
    }

    async fn store(&self, key: &str, data: &AiPricingData) -> Result<()> {
        self.entries.write().insert(key.to_string(), data.clone());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Derive the lookup key for a research query.
///
/// Lowercases `"{work_type}-{city}-{scope}"`, drops everything outside
/// `[a-z0-9-]` and keeps the first 100 characters.
pub fn cache_key(scope_of_work: &str, city: &str, work_type: WorkType) -> String {
    format!("{}-{}-{}", work_type.as_str(), city, scope_of_work)
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .take(MAX_KEY_LEN)
        .collect()
}

/// Expiring view over a `PricingStore`.
#[derive(Clone)]
pub struct PricingCache {
    store: Arc<dyn PricingStore>,
    clock: Arc<dyn Clock>,
    retention: Duration,
}

impl PricingCache {
    pub fn new(store: Arc<dyn PricingStore>, clock: Arc<dyn Clock>, retention_days: i64) -> Self {
        Self {
            store,
            clock,
            retention: Duration::days(retention_days),
        }
    }

    /// Cached entry, or `None` if missing or stale.
    pub async fn get(&self, key: &str) -> Option<AiPricingData> {
        let entry = self.store.load(key).await?;
        let age = self.clock.now() - entry.last_updated;

        if age < self.retention {
            Some(entry)
        } else {
            debug!(key = key, age_days = age.num_days(), "Ignoring stale pricing cache entry");
            None
        }
    }

    /// Upsert unconditionally.
    pub async fn put(&self, key: &str, data: &AiPricingData) -> Result<()> {
        self.store.store(key, data).await
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub async fn health_check(&self) -> Result<()> {
        self.store.health_check().await
    }
}
