use axum::{extract::DefaultBodyLimit, http::HeaderValue, Router};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::auth::TokenVerifier;
use crate::config::Settings;
use crate::middleware::request_id_layer;
use crate::routes;
use crate::services::{PricingResearcher, ProviderRegistry};

/// Shared application state
pub struct AppState {
    pub db: PgPool,
    pub settings: Settings,
    pub verifier: TokenVerifier,
    /// Research orchestrator; owns the pricing cache
    pub researcher: PricingResearcher,
    pub providers: ProviderRegistry,
}

impl AppState {
    pub fn new(
        db: PgPool,
        settings: Settings,
        verifier: TokenVerifier,
        researcher: PricingResearcher,
        providers: ProviderRegistry,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            settings,
            verifier,
            researcher,
            providers,
        })
    }
}

/// Build the complete application with all middleware
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.settings);
    let body_limit = state.settings.request_body_limit_bytes;

    // Build trace layer (use DEBUG for spans to reduce overhead at INFO level)
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG));

    let (set_request_id, propagate_request_id) = request_id_layer();

    Router::new()
        .merge(routes::api_router())
        // Middleware stack (applied bottom-up)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(propagate_request_id)
        .layer(trace_layer)
        .layer(set_request_id)
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    // Longer preflight cache in development
    let max_age = if settings.env.is_dev() {
        std::time::Duration::from_secs(86400)
    } else {
        std::time::Duration::from_secs(3600)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::list([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::HeaderName::from_static("x-request-id"),
        ]))
        .expose_headers([
            axum::http::header::CONTENT_DISPOSITION,
            axum::http::HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true)
        .max_age(max_age)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::verifier::tests::{mint, SECRET};
    use crate::services::pricing_cache::{MemoryPricingStore, SystemClock, DEFAULT_RETENTION_DAYS};
    use crate::services::PricingCache;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use std::collections::HashMap;
    use std::time::Duration;
    use tower::ServiceExt;
    use uuid::Uuid;

    /// State backed by an in-memory cache and a pool that never connects.
    pub fn test_state(providers: ProviderRegistry) -> Arc<AppState> {
        let vars: HashMap<&str, &str> = [
            ("DATABASE_URL", "postgres://postgres@127.0.0.1:1/estimator_test"),
            ("JWT_SECRET", SECRET),
            ("PRICING_CACHE_BACKEND", "memory"),
            ("REQUEST_BODY_LIMIT_BYTES", "4096"),
        ]
        .into_iter()
        .collect();
        let settings = Settings::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        let db = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(250))
            .connect_lazy(&settings.database_url)
            .unwrap();

        let cache = PricingCache::new(
            Arc::new(MemoryPricingStore::new()),
            Arc::new(SystemClock),
            DEFAULT_RETENTION_DAYS,
        );

        let verifier = TokenVerifier::from_settings(&settings);
        AppState::new(db, settings, verifier, PricingResearcher::new(cache), providers)
    }

    pub fn bearer() -> String {
        format!("Bearer {}", mint(SECRET, Uuid::new_v4(), "authenticated", 3600))
    }

    /// Send a JSON request through the full middleware stack.
    pub async fn send(
        state: Arc<AppState>,
        method: Method,
        uri: &str,
        auth: Option<String>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, axum::http::HeaderMap, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let request = match body {
            Some(body) => {
                let body = body.to_string();
                builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::CONTENT_LENGTH, body.len())
                    .body(Body::from(body))
                    .unwrap()
            }
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = create_app(state).oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);

        (status, headers, json)
    }

    #[tokio::test]
    async fn request_id_is_echoed() {
        let (_, headers, _) = send(
            test_state(ProviderRegistry::new()),
            Method::POST,
            "/pricing/calculate",
            None,
            None,
        )
        .await;

        assert!(headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let scope = "x".repeat(8192);
        let (status, _, _) = send(
            test_state(ProviderRegistry::new()),
            Method::POST,
            "/ai/pricing",
            Some(bearer()),
            Some(serde_json::json!({
                "scope_of_work": scope,
                "city": "Austin",
                "work_type": "repair"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }
}
