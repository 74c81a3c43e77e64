pub mod ai;
pub mod estimates;
pub mod health;
pub mod pricing;
pub mod settings;
pub mod templates;

use axum::{routing::get, routing::post, Router};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        // Calculator
        .route("/pricing/calculate", post(pricing::calculate))
        // Estimates
        .route(
            "/estimates",
            get(estimates::list_estimates).post(estimates::create_estimate),
        )
        .route("/estimates/sync", post(estimates::sync_estimates))
        .route(
            "/estimates/:id",
            get(estimates::get_estimate)
                .patch(estimates::update_estimate)
                .delete(estimates::delete_estimate),
        )
        .route("/estimates/:id/export", get(estimates::export_estimate))
        // Scope templates
        .route(
            "/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/templates/:id",
            get(templates::get_template)
                .patch(templates::update_template)
                .delete(templates::delete_template),
        )
        .route("/templates/:id/use", post(templates::use_template))
        // User settings
        .route(
            "/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        // AI pricing research
        .route("/ai/pricing", post(ai::research_pricing))
}
