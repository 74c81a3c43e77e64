//! AI pricing research orchestrator.
//!
//! Cache lookup, prompt construction, provider dispatch, lenient parsing and
//! cache population for one market-pricing question. Failures never write to
//! the cache.

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::llm::{LlmError, TextGenerator};
use super::pricing_cache::{cache_key, PricingCache};
use super::prompts::pricing_research_prompt;
use crate::domain::ai::{AiPricingData, Confidence, PriceRange, PricingSource};
use crate::domain::estimates::WorkType;

#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("Pricing research failed: {0}")]
    Provider(#[from] LlmError),

    #[error("Failed to parse AI response: {0}")]
    Parse(String),

    #[error("AI provider '{0}' is not configured")]
    ProviderNotConfigured(&'static str),
}

/// Runs research against an injected provider, backed by the pricing cache.
#[derive(Clone)]
pub struct PricingResearcher {
    cache: PricingCache,
}

impl PricingResearcher {
    pub fn new(cache: PricingCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &PricingCache {
        &self.cache
    }

    /// Research market pricing, serving a fresh cached result when present.
    pub async fn research(
        &self,
        scope_of_work: &str,
        city: &str,
        work_type: WorkType,
        provider: &dyn TextGenerator,
    ) -> Result<AiPricingData, ResearchError> {
        self.run(scope_of_work, city, work_type, provider, false).await
    }

    /// Ask the provider again regardless of the cache, then overwrite the entry.
    pub async fn refresh(
        &self,
        scope_of_work: &str,
        city: &str,
        work_type: WorkType,
        provider: &dyn TextGenerator,
    ) -> Result<AiPricingData, ResearchError> {
        self.run(scope_of_work, city, work_type, provider, true).await
    }

    #[instrument(skip(self, scope_of_work, provider), fields(provider = provider.name(), cache_hit))]
    async fn run(
        &self,
        scope_of_work: &str,
        city: &str,
        work_type: WorkType,
        provider: &dyn TextGenerator,
        skip_cache: bool,
    ) -> Result<AiPricingData, ResearchError> {
        let key = cache_key(scope_of_work, city, work_type);

        if !skip_cache {
            if let Some(cached) = self.cache.get(&key).await {
                debug!(key = %key, "Using cached pricing research");
                tracing::Span::current().record("cache_hit", true);
                return Ok(cached);
            }
        }
        tracing::Span::current().record("cache_hit", false);

        let prompt = pricing_research_prompt(scope_of_work, city, work_type);
        let raw = provider.generate(&prompt).await?;

        let data = parse_response(&raw, self.cache.clock().now())?;

        if let Err(e) = self.cache.put(&key, &data).await {
            warn!(key = %key, error = %e, "Failed to cache pricing research");
        }

        info!(
            average_price = data.average_price,
            confidence = data.confidence.as_str(),
            sources = data.sources.len(),
            "Pricing research complete"
        );

        Ok(data)
    }
}

/// Parse a provider reply into `AiPricingData`.
///
/// Malformed JSON (or JSON that is not an object) is an error; missing or
/// mistyped fields fall back to zero, empty or `low`.
pub fn parse_response(raw: &str, now: DateTime<Utc>) -> Result<AiPricingData, ResearchError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| ResearchError::Parse(e.to_string()))?;

    let obj = value
        .as_object()
        .ok_or_else(|| ResearchError::Parse("expected a JSON object".to_string()))?;

    let price_range = obj.get("priceRange");

    Ok(AiPricingData {
        average_price: number(obj.get("averagePrice")),
        price_range: PriceRange {
            min: number(price_range.and_then(|r| r.get("min"))),
            max: number(price_range.and_then(|r| r.get("max"))),
        },
        sources: obj
            .get("sources")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(parse_source).collect())
            .unwrap_or_default(),
        confidence: obj
            .get("confidence")
            .and_then(Value::as_str)
            .map(Confidence::parse_lenient)
            .unwrap_or_default(),
        last_updated: now,
        search_query: text(obj.get("searchQuery")),
    })
}

fn parse_source(value: &Value) -> Option<PricingSource> {
    let obj = value.as_object()?;
    Some(PricingSource {
        source: text(obj.get("source")),
        price: number(obj.get("price")),
        url: obj
            .get("url")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string),
        description: text(obj.get("description")),
    })
}

fn number(value: Option<&Value>) -> f64 {
    value
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

fn text(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Drop a surrounding ```json ... ``` fence, if any.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Skip the info string on the opening fence line
    match inner.split_once('\n') {
        Some((info, body)) if !info.trim_start().starts_with('{') => body.trim(),
        _ => inner.trim(),
    }
}
