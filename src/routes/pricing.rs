//! Pricing calculator route

use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::pricing::CalculationInput;
use crate::error::ApiError;
use crate::services::calculator;

/// POST /pricing/calculate
///
/// Price labor and materials without storing anything.
pub async fn calculate(
    State(_state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(input): Json<CalculationInput>,
) -> Result<impl IntoResponse, ApiError> {
    let breakdown = calculator::checked_compute(&input)?;

    tracing::debug!(
        user_id = %auth.user_id,
        materials = input.material_items.len(),
        total = breakdown.total,
        "Calculated pricing"
    );

    Ok(Json(DataResponse::new(breakdown)))
}

#[cfg(test)]
mod tests {
    use crate::app::tests::{bearer, send, test_state};
    use crate::services::ProviderRegistry;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn calculates_the_reference_scenario() {
        let (status, _, body) = send(
            test_state(ProviderRegistry::new()),
            Method::POST,
            "/pricing/calculate",
            Some(bearer()),
            Some(json!({
                "labor_hours": 8,
                "hourly_rate": 75,
                "material_items": [{"description": "20A breaker", "quantity": 2, "unit_cost": 15}],
                "markup_percentage": 20
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["labor"]["total"], 600.0);
        assert_eq!(data["labor"]["description"], "8 hours @ $75.00/hr");
        assert_eq!(data["materials"]["subtotal"], 30.0);
        assert_eq!(data["materials"]["items"][0]["id"], "mat-0");
        assert_eq!(data["subtotal"], 630.0);
        assert_eq!(data["total"], 756.0);
    }

    #[tokio::test]
    async fn negative_inputs_are_rejected() {
        let (status, _, body) = send(
            test_state(ProviderRegistry::new()),
            Method::POST,
            "/pricing/calculate",
            Some(bearer()),
            Some(json!({"labor_hours": -1, "hourly_rate": 75, "markup_percentage": 20})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert_eq!(body["details"][0], "labor_hours must be greater than or equal to 0");
    }

    #[tokio::test]
    async fn overflowing_totals_are_rejected() {
        let (status, _, body) = send(
            test_state(ProviderRegistry::new()),
            Method::POST,
            "/pricing/calculate",
            Some(bearer()),
            Some(json!({"labor_hours": 1e200, "hourly_rate": 1e200, "markup_percentage": 20})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert_eq!(body["details"][0], "labor.total exceeds the supported range");
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let token = crate::auth::verifier::tests::mint(
            crate::auth::verifier::tests::SECRET,
            uuid::Uuid::new_v4(),
            "authenticated",
            -3600,
        );
        let (status, _, _) = send(
            test_state(ProviderRegistry::new()),
            Method::POST,
            "/pricing/calculate",
            Some(format!("Bearer {}", token)),
            Some(json!({"labor_hours": 1, "hourly_rate": 1, "markup_percentage": 0})),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
