//! Service layer: pricing math, the research cache, AI providers and export.

pub mod cache;
pub mod calculator;
pub mod export;
pub mod llm;
pub mod pricing_cache;
pub mod prompts;
pub mod research;

pub use cache::RedisCache;
pub use llm::ProviderRegistry;
pub use pricing_cache::{MemoryPricingStore, PricingCache, PricingStore, SystemClock};
pub use research::{PricingResearcher, ResearchError};
