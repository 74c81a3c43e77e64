use anyhow::{bail, Context, Result};
use std::env;

use crate::domain::ai::AiProvider;
use crate::services::pricing_cache::DEFAULT_RETENTION_DAYS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

/// Where AI pricing research is cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PricingCacheBackend {
    Redis { url: String },
    Memory,
}

/// Connection details for one text-generation provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,
    pub request_body_limit_bytes: usize,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Pricing cache
    pub pricing_cache: PricingCacheBackend,
    pub pricing_cache_retention_days: i64,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Auth
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: String,

    // AI providers; `None` when no API key is set
    pub openai: Option<ProviderSettings>,
    pub anthropic: Option<ProviderSettings>,
    pub ai_timeout_seconds: u64,
    pub default_ai_provider: AiProvider,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let parsed = |key: &str, default: u64| -> u64 {
            var(key)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(default)
        };

        let env = Environment::from_str(&var("ENV").unwrap_or_else(|| "dev".to_string()));
        let server_addr = var("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let request_body_limit_bytes = var("REQUEST_BODY_LIMIT_BYTES")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1024 * 1024);

        // Database
        let database_url = var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_connections = parsed("DATABASE_MAX_CONNECTIONS", 10) as u32;

        // Pricing cache
        let pricing_cache = match var("PRICING_CACHE_BACKEND")
            .unwrap_or_else(|| "redis".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => PricingCacheBackend::Memory,
            "redis" => PricingCacheBackend::Redis {
                url: var("REDIS_URL").unwrap_or_else(|| "redis://redis:6379/0".to_string()),
            },
            other => bail!("PRICING_CACHE_BACKEND must be 'redis' or 'memory', got '{}'", other),
        };
        let pricing_cache_retention_days =
            parsed("PRICING_CACHE_RETENTION_DAYS", DEFAULT_RETENTION_DAYS as u64) as i64;

        // CORS
        let cors_allow_origins = var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Auth
        let jwt_secret = var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let jwt_issuer = var("JWT_ISSUER");
        let jwt_audience = var("JWT_AUDIENCE").unwrap_or_else(|| "authenticated".to_string());

        // AI providers
        let openai = var("OPENAI_API_KEY").map(|api_key| ProviderSettings {
            api_key,
            base_url: var("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: var("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
        });
        let anthropic = var("ANTHROPIC_API_KEY").map(|api_key| ProviderSettings {
            api_key,
            base_url: var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|| "https://api.anthropic.com".to_string()),
            model: var("ANTHROPIC_MODEL")
                .unwrap_or_else(|| "claude-3-5-sonnet-latest".to_string()),
        });
        let ai_timeout_seconds = parsed("AI_TIMEOUT_SECONDS", 120); // LLM calls are slow
        let default_ai_provider = match var("DEFAULT_AI_PROVIDER") {
            Some(s) => AiProvider::from_str(&s)
                .with_context(|| format!("DEFAULT_AI_PROVIDER must be 'openai' or 'anthropic', got '{}'", s))?,
            None => AiProvider::Openai,
        };

        Ok(Settings {
            env,
            server_addr,
            request_body_limit_bytes,
            database_url,
            database_max_connections,
            pricing_cache,
            pricing_cache_retention_days,
            cors_allow_origins,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            openai,
            anthropic,
            ai_timeout_seconds,
            default_ai_provider,
        })
    }
}
