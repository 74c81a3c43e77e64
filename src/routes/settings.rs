//! User settings routes
//!
//! Company details and pricing defaults endpoints.

use axum::{extract::State, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::ai::AiProvider;
use crate::domain::settings::{Theme, UpdateUserSettingsRequest, UserSettingsResponse};
use crate::error::ApiError;

/// Database row for user settings
#[derive(Debug, sqlx::FromRow)]
struct UserSettingsRow {
    company_name: String,
    company_email: Option<String>,
    company_phone: Option<String>,
    company_address: Option<String>,
    default_hourly_rate: f64,
    default_markup_percentage: f64,
    preferred_ai_provider: String,
    theme: String,
    updated_at: DateTime<Utc>,
}

impl From<UserSettingsRow> for UserSettingsResponse {
    fn from(row: UserSettingsRow) -> Self {
        Self {
            company_name: row.company_name,
            company_email: row.company_email,
            company_phone: row.company_phone,
            company_address: row.company_address,
            default_hourly_rate: row.default_hourly_rate,
            default_markup_percentage: row.default_markup_percentage,
            preferred_ai_provider: AiProvider::from_str(&row.preferred_ai_provider)
                .unwrap_or_default(),
            theme: Theme::from_db(&row.theme),
            updated_at: Some(row.updated_at),
        }
    }
}

/// Stored settings for `user_id`, if any.
pub(crate) async fn find_user_settings(
    db: &PgPool,
    user_id: Uuid,
) -> Result<Option<UserSettingsResponse>, ApiError> {
    let row = sqlx::query_as::<_, UserSettingsRow>(
        r#"
        SELECT company_name, company_email, company_phone, company_address,
               default_hourly_rate, default_markup_percentage,
               preferred_ai_provider, theme, updated_at
        FROM user_settings
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(row.map(Into::into))
}

/// Stored settings for `user_id`, or the defaults if none are stored yet.
pub(crate) async fn load_user_settings(
    db: &PgPool,
    user_id: Uuid,
) -> Result<UserSettingsResponse, ApiError> {
    Ok(find_user_settings(db, user_id).await?.unwrap_or_default())
}

/// GET /settings
///
/// Get user settings.
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let settings = load_user_settings(&state.db, auth.user_id).await?;
    Ok(Json(DataResponse::new(settings)))
}

/// PUT /settings
///
/// Update user settings. Omitted fields keep their stored (or default) value.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<UpdateUserSettingsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ApiError::check(req.validate())?;

    let current = load_user_settings(&state.db, auth.user_id).await?;
    let merged = req.apply(current);

    let row = sqlx::query_as::<_, UserSettingsRow>(
        r#"
        INSERT INTO user_settings (
            user_id, company_name, company_email, company_phone, company_address,
            default_hourly_rate, default_markup_percentage, preferred_ai_provider,
            theme, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
        ON CONFLICT (user_id) DO UPDATE SET
            company_name = EXCLUDED.company_name,
            company_email = EXCLUDED.company_email,
            company_phone = EXCLUDED.company_phone,
            company_address = EXCLUDED.company_address,
            default_hourly_rate = EXCLUDED.default_hourly_rate,
            default_markup_percentage = EXCLUDED.default_markup_percentage,
            preferred_ai_provider = EXCLUDED.preferred_ai_provider,
            theme = EXCLUDED.theme,
            updated_at = NOW()
        RETURNING company_name, company_email, company_phone, company_address,
                  default_hourly_rate, default_markup_percentage,
                  preferred_ai_provider, theme, updated_at
        "#,
    )
    .bind(auth.user_id)
    .bind(&merged.company_name)
    .bind(&merged.company_email)
    .bind(&merged.company_phone)
    .bind(&merged.company_address)
    .bind(merged.default_hourly_rate)
    .bind(merged.default_markup_percentage)
    .bind(merged.preferred_ai_provider.as_str())
    .bind(merged.theme.as_str())
    .fetch_one(&state.db)
    .await?;

    tracing::info!(user_id = %auth.user_id, "User settings updated");

    Ok(Json(DataResponse::new(UserSettingsResponse::from(row))))
}

#[cfg(test)]
mod tests {
    use crate::app::tests::{bearer, send, test_state};
    use crate::services::ProviderRegistry;
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn markup_over_one_hundred_is_rejected_before_storage() {
        let (status, _, body) = send(
            test_state(ProviderRegistry::new()),
            Method::PUT,
            "/settings",
            Some(bearer()),
            Some(serde_json::json!({"default_markup_percentage": 150})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert_eq!(body["details"][0], "default_markup_percentage must be at most 100");
    }

    #[tokio::test]
    async fn settings_require_auth() {
        let (status, _, body) = send(
            test_state(ProviderRegistry::new()),
            Method::GET,
            "/settings",
            None,
            None,
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
}
