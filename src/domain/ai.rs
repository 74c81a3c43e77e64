//! AI pricing research domain models.
//!
//! `AiPricingData` is produced only by the research orchestrator and is
//! stored verbatim on an estimate once attached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::estimates::WorkType;

/// Provider-reported certainty of a market-price estimate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Lenient parse; anything unrecognised is `Low`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            _ => Self::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// A single price reference cited by the provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingSource {
    pub source: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub description: String,
}

/// Market pricing research result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiPricingData {
    pub average_price: f64,
    pub price_range: PriceRange,
    pub sources: Vec<PricingSource>,
    pub confidence: Confidence,
    pub last_updated: DateTime<Utc>,
    pub search_query: String,
}

/// Text-generation backend selector
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum AiProvider {
    #[default]
    Openai,
    Anthropic,
}

impl AiProvider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Some(Self::Openai),
            "anthropic" => Some(Self::Anthropic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

/// Request DTO for AI pricing research
#[derive(Debug, Clone, Deserialize)]
pub struct AiPricingRequest {
    pub scope_of_work: String,
    pub city: String,
    pub work_type: WorkType,
    #[serde(default)]
    pub provider: Option<AiProvider>,
    /// Attach the result to this estimate.
    #[serde(default)]
    pub estimate_id: Option<Uuid>,
    /// Skip the cache read and ask the provider again.
    #[serde(default)]
    pub refresh: bool,
}

impl AiPricingRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.scope_of_work.trim().is_empty() {
            errors.push("scope_of_work is required".to_string());
        }
        if self.city.trim().is_empty() {
            errors.push("city is required".to_string());
        }
        errors
    }
}

/// Response DTO for AI pricing research
#[derive(Debug, Clone, Serialize)]
pub struct AiPricingResponse {
    pub provider: AiProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate_id: Option<Uuid>,
    pub pricing: AiPricingData,
}
