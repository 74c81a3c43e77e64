//! AI pricing research endpoint.
//!
//! Picks a provider (request, then the user's preference, then the server
//! default), runs cached research and optionally attaches the result to one
//! of the user's estimates.

use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use super::estimates::attach_ai_pricing;
use super::settings::find_user_settings;
use crate::api::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::ai::{AiPricingRequest, AiPricingResponse};
use crate::error::{ApiError, ApiResult};
use crate::services::ResearchError;

/// POST /ai/pricing
pub async fn research_pricing(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<AiPricingRequest>,
) -> ApiResult<impl IntoResponse> {
    ApiError::check(req.validate())?;

    let provider = match req.provider {
        Some(provider) => provider,
        None => find_user_settings(&state.db, auth.user_id)
            .await?
            .map(|s| s.preferred_ai_provider)
            .unwrap_or(state.settings.default_ai_provider),
    };

    let generator = state
        .providers
        .get(provider)
        .ok_or(ResearchError::ProviderNotConfigured(provider.as_str()))?;

    tracing::info!(
        user_id = %auth.user_id,
        provider = provider.as_str(),
        work_type = req.work_type.as_str(),
        city = %req.city,
        refresh = req.refresh,
        "Researching pricing"
    );

    let researcher = &state.researcher;
    let pricing = if req.refresh {
        researcher
            .refresh(&req.scope_of_work, &req.city, req.work_type, generator.as_ref())
            .await?
    } else {
        researcher
            .research(&req.scope_of_work, &req.city, req.work_type, generator.as_ref())
            .await?
    };

    if let Some(estimate_id) = req.estimate_id {
        attach_ai_pricing(&state.db, auth.user_id, estimate_id, &pricing).await?;
        tracing::info!(estimate_id = %estimate_id, "AI pricing attached to estimate");
    }

    Ok(Json(DataResponse::new(AiPricingResponse {
        provider,
        estimate_id: req.estimate_id,
        pricing,
    })))
}

#[cfg(test)]
mod tests {
    use crate::app::tests::{bearer, send, test_state};
    use crate::domain::ai::AiProvider;
    use crate::services::llm::tests::StubGenerator;
    use crate::services::ProviderRegistry;
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use std::sync::Arc;

    fn registry(provider: AiProvider, stub: Arc<StubGenerator>) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        registry.register(provider, stub);
        registry
    }

    fn request(provider: &str) -> serde_json::Value {
        json!({
            "scope_of_work": "Upgrade 100A panel to 200A",
            "city": "Phoenix",
            "work_type": "residential_panel_upgrade",
            "provider": provider
        })
    }

    #[tokio::test]
    async fn research_is_cached_across_requests() {
        let stub = Arc::new(StubGenerator::replying(
            r#"{"averagePrice": 2400, "priceRange": {"min": 2000, "max": 2900}, "confidence": "medium"}"#,
        ));
        let state = test_state(registry(AiProvider::Anthropic, stub.clone()));

        for _ in 0..2 {
            let (status, _, body) = send(
                state.clone(),
                Method::POST,
                "/ai/pricing",
                Some(bearer()),
                Some(request("anthropic")),
            )
            .await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["data"]["provider"], "anthropic");
            assert_eq!(body["data"]["pricing"]["average_price"], 2400.0);
            assert_eq!(body["data"]["pricing"]["confidence"], "medium");
            assert_eq!(body["data"]["pricing"]["sources"], json!([]));
        }

        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn refresh_asks_the_provider_again() {
        let stub = Arc::new(StubGenerator::replying(r#"{"averagePrice": 100}"#));
        let state = test_state(registry(AiProvider::Openai, stub.clone()));

        let mut body = request("openai");
        send(state.clone(), Method::POST, "/ai/pricing", Some(bearer()), Some(body.clone())).await;
        body["refresh"] = json!(true);
        let (status, _, _) =
            send(state, Method::POST, "/ai/pricing", Some(bearer()), Some(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn unconfigured_provider_is_unavailable() {
        let stub = Arc::new(StubGenerator::replying("{}"));
        let state = test_state(registry(AiProvider::Openai, stub.clone()));

        let (status, _, body) = send(
            state,
            Method::POST,
            "/ai/pricing",
            Some(bearer()),
            Some(request("anthropic")),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "AI_PROVIDER_NOT_CONFIGURED");
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn unparseable_reply_is_a_gateway_error() {
        let stub = Arc::new(StubGenerator::replying("Sorry, I can't help with that."));
        let state = test_state(registry(AiProvider::Openai, stub.clone()));

        for _ in 0..2 {
            let (status, _, body) = send(
                state.clone(),
                Method::POST,
                "/ai/pricing",
                Some(bearer()),
                Some(request("openai")),
            )
            .await;

            assert_eq!(status, StatusCode::BAD_GATEWAY);
            assert_eq!(body["code"], "AI_RESPONSE_PARSE_FAILED");
        }

        // Failures are never cached
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn provider_failure_is_a_gateway_error() {
        let stub = Arc::new(StubGenerator::failing("upstream overloaded"));
        let state = test_state(registry(AiProvider::Openai, stub));

        let (status, _, body) = send(
            state,
            Method::POST,
            "/ai/pricing",
            Some(bearer()),
            Some(request("openai")),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "PRICING_RESEARCH_FAILED");
    }

    #[tokio::test]
    async fn blank_city_is_rejected() {
        let mut body = request("openai");
        body["city"] = json!("   ");

        let (status, _, body) = send(
            test_state(ProviderRegistry::new()),
            Method::POST,
            "/ai/pricing",
            Some(bearer()),
            Some(body),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0], "city is required");
    }
}
