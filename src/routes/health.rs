use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;
use crate::db;
use crate::domain::ai::AiProvider;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: ServiceHealth,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    pub database: String,
    pub pricing_cache: String,
    pub pricing_cache_backend: String,
    pub providers: ProviderHealth,
}

/// Which AI providers have credentials configured
#[derive(Serialize)]
pub struct ProviderHealth {
    pub openai: bool,
    pub anthropic: bool,
}

/// Health check endpoint - public
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let cache = state.researcher.cache();
    let (db_ok, cache_result) = tokio::join!(db::health_check(&state.db), cache.health_check());

    if let Err(e) = &cache_result {
        tracing::warn!(error = %e, backend = cache.backend_name(), "Pricing cache health check failed");
    }

    let providers = ProviderHealth {
        openai: state.providers.is_configured(AiProvider::Openai),
        anthropic: state.providers.is_configured(AiProvider::Anthropic),
    };

    // DB is critical; a cache outage or missing provider only degrades
    let status = if !db_ok {
        "unhealthy"
    } else if cache_result.is_err() || !(providers.openai || providers.anthropic) {
        "degraded"
    } else {
        "healthy"
    };

    let status_code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            services: ServiceHealth {
                database: label(db_ok),
                pricing_cache: label(cache_result.is_ok()),
                pricing_cache_backend: cache.backend_name().to_string(),
                providers,
            },
        }),
    )
}

fn label(ok: bool) -> String {
    let label = if ok { "ok" } else { "error" };
    label.to_string()
}

#[cfg(test)]
mod tests {
    use crate::app::tests::{send, test_state};
    use crate::domain::ai::AiProvider;
    use crate::services::llm::tests::StubGenerator;
    use crate::services::ProviderRegistry;
    use axum::http::{Method, StatusCode};
    use std::sync::Arc;

    #[tokio::test]
    async fn unreachable_database_is_unhealthy() {
        let mut providers = ProviderRegistry::new();
        providers.register(AiProvider::Anthropic, Arc::new(StubGenerator::replying("{}")));

        let (status, _, body) =
            send(test_state(providers), Method::GET, "/health", None, None).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["services"]["database"], "error");
        assert_eq!(body["services"]["pricing_cache"], "ok");
        assert_eq!(body["services"]["pricing_cache_backend"], "memory");
        assert_eq!(body["services"]["providers"]["openai"], false);
        assert_eq!(body["services"]["providers"]["anthropic"], true);
    }
}
