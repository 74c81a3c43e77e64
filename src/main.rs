mod api;
mod app;
mod auth;
mod config;
mod db;
mod domain;
mod error;
mod logging;
mod middleware;
mod routes;
mod services;

use anyhow::Result;
use std::sync::Arc;

use config::PricingCacheBackend;
use services::{
    MemoryPricingStore, PricingCache, PricingResearcher, PricingStore, ProviderRegistry,
    RedisCache, SystemClock,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        default_ai_provider = settings.default_ai_provider.as_str(),
        "Starting estimator backend"
    );

    // Create database pool and bring the schema up to date
    let pool = db::create_pool(&settings).await?;
    db::run_migrations(&pool).await?;

    // Pricing cache storage
    let store: Arc<dyn PricingStore> = match &settings.pricing_cache {
        PricingCacheBackend::Redis { url } => {
            Arc::new(RedisCache::new(url, settings.pricing_cache_retention_days).await?)
        }
        PricingCacheBackend::Memory => {
            tracing::warn!("Using in-memory pricing cache; entries are lost on restart");
            Arc::new(MemoryPricingStore::new())
        }
    };
    let cache = PricingCache::new(
        store,
        Arc::new(SystemClock),
        settings.pricing_cache_retention_days,
    );

    // AI providers with configured credentials
    let providers = ProviderRegistry::from_settings(&settings)?;
    if !providers.is_configured(settings.default_ai_provider) {
        tracing::warn!(
            provider = settings.default_ai_provider.as_str(),
            "Default AI provider has no API key; research requests will need another provider"
        );
    }

    let verifier = auth::TokenVerifier::from_settings(&settings);

    // Create application state
    let server_addr = settings.server_addr.clone();
    let state = app::AppState::new(
        pool,
        settings,
        verifier,
        PricingResearcher::new(cache),
        providers,
    );

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&server_addr).await?;
    tracing::info!("Listening on {}", server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
