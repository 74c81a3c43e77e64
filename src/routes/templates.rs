//! Scope template routes
//!
//! Reusable scope/labor/material presets owned by one user.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use sqlx::types::Json as DbJson;
use std::sync::Arc;
use uuid::Uuid;

use super::settings::load_user_settings;
use crate::api::{Created, DataResponse, NoContent};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::estimates::WorkType;
use crate::domain::pricing::CalculationInput;
use crate::domain::templates::{
    CreateTemplateRequest, DeleteTemplateQuery, TemplateListQuery, TemplateMaterial,
    TemplateResponse, TemplateUseResponse, UpdateTemplateRequest,
};
use crate::error::ApiError;
use crate::services::calculator;

const TEMPLATE_COLUMNS: &str = "id, name, description, work_types, scope_text, \
     suggested_labor_hours, materials, is_active, usage_count, created_at, updated_at";

/// Database row for scope template
#[derive(Debug, sqlx::FromRow)]
struct TemplateRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    work_types: Vec<String>,
    scope_text: String,
    suggested_labor_hours: f64,
    materials: DbJson<Vec<TemplateMaterial>>,
    is_active: bool,
    usage_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TemplateRow> for TemplateResponse {
    fn from(row: TemplateRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            // Unknown values can only come from manual edits; drop them
            work_types: row
                .work_types
                .iter()
                .filter_map(|w| WorkType::from_str(w))
                .collect(),
            scope_text: row.scope_text,
            suggested_labor_hours: row.suggested_labor_hours,
            materials: row.materials.0,
            is_active: row.is_active,
            usage_count: row.usage_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn work_type_names(work_types: &[WorkType]) -> Vec<String> {
    work_types.iter().map(|w| w.as_str().to_string()).collect()
}

/// GET /templates
///
/// List templates, optionally filtered to one work type.
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Query(query): Query<TemplateListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let work_type = query.work_type.map(|w| w.as_str());

    let rows = sqlx::query_as::<_, TemplateRow>(&format!(
        r#"
        SELECT {}
        FROM scope_templates
        WHERE user_id = $1
          AND ($2::TEXT IS NULL OR $2 = ANY(work_types))
          AND (NOT $3 OR is_active)
        ORDER BY {}
        "#,
        TEMPLATE_COLUMNS,
        query.sort_by.order_by()
    ))
    .bind(auth.user_id)
    .bind(work_type)
    .bind(query.active_only)
    .fetch_all(&state.db)
    .await?;

    tracing::debug!(
        user_id = %auth.user_id,
        work_type = ?work_type,
        count = rows.len(),
        "Listed templates"
    );

    let data: Vec<TemplateResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Json(DataResponse::new(data)))
}

/// POST /templates
pub async fn create_template(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<CreateTemplateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ApiError::check(req.validate())?;

    let row = sqlx::query_as::<_, TemplateRow>(&format!(
        r#"
        INSERT INTO scope_templates (
            id, user_id, name, description, work_types, scope_text,
            suggested_labor_hours, materials
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {}
        "#,
        TEMPLATE_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(auth.user_id)
    .bind(req.name.trim())
    .bind(req.description.as_deref().map(str::trim))
    .bind(work_type_names(&req.work_types))
    .bind(&req.scope_text)
    .bind(req.suggested_labor_hours)
    .bind(DbJson(&req.materials))
    .fetch_one(&state.db)
    .await?;

    tracing::info!(user_id = %auth.user_id, template_id = %row.id, "Template created");

    Ok(Created(TemplateResponse::from(row)))
}

/// GET /templates/:id
pub async fn get_template(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(template_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row = sqlx::query_as::<_, TemplateRow>(&format!(
        "SELECT {} FROM scope_templates WHERE id = $1 AND user_id = $2",
        TEMPLATE_COLUMNS
    ))
    .bind(template_id)
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Template not found"))?;

    Ok(Json(DataResponse::new(TemplateResponse::from(row))))
}

/// PATCH /templates/:id
pub async fn update_template(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(template_id): Path<Uuid>,
    Json(req): Json<UpdateTemplateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ApiError::check(req.validate())?;

    let row = sqlx::query_as::<_, TemplateRow>(&format!(
        r#"
        UPDATE scope_templates SET
            name = COALESCE($3, name),
            description = COALESCE($4, description),
            work_types = COALESCE($5, work_types),
            scope_text = COALESCE($6, scope_text),
            suggested_labor_hours = COALESCE($7, suggested_labor_hours),
            materials = COALESCE($8, materials),
            is_active = COALESCE($9, is_active),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING {}
        "#,
        TEMPLATE_COLUMNS
    ))
    .bind(template_id)
    .bind(auth.user_id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(req.description.as_deref().map(str::trim))
    .bind(req.work_types.as_deref().map(work_type_names))
    .bind(req.scope_text.as_deref())
    .bind(req.suggested_labor_hours)
    .bind(req.materials.as_ref().map(DbJson))
    .bind(req.is_active)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Template not found"))?;

    tracing::info!(user_id = %auth.user_id, template_id = %template_id, "Template updated");

    Ok(Json(DataResponse::new(TemplateResponse::from(row))))
}

/// DELETE /templates/:id
///
/// Deactivates the template; `?hard=true` removes the row.
pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(template_id): Path<Uuid>,
    Query(query): Query<DeleteTemplateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let sql = if query.hard {
        "DELETE FROM scope_templates WHERE id = $1 AND user_id = $2"
    } else {
        "UPDATE scope_templates SET is_active = FALSE, updated_at = NOW() WHERE id = $1 AND user_id = $2"
    };

    let result = sqlx::query(sql)
        .bind(template_id)
        .bind(auth.user_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Template not found"));
    }

    tracing::info!(
        user_id = %auth.user_id,
        template_id = %template_id,
        hard = query.hard,
        "Template deleted"
    );

    Ok(NoContent)
}

/// POST /templates/:id/use
///
/// Count one use of an active template and preview its pricing at the user's
/// default rate and markup.
pub async fn use_template(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(template_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row = sqlx::query_as::<_, TemplateRow>(&format!(
        r#"
        UPDATE scope_templates SET usage_count = usage_count + 1
        WHERE id = $1 AND user_id = $2 AND is_active
        RETURNING {}
        "#,
        TEMPLATE_COLUMNS
    ))
    .bind(template_id)
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Template not found or inactive"))?;

    let template = TemplateResponse::from(row);
    let settings = load_user_settings(&state.db, auth.user_id).await?;

    let pricing_preview = calculator::checked_compute(&CalculationInput {
        labor_hours: template.suggested_labor_hours,
        hourly_rate: settings.default_hourly_rate,
        material_items: template.materials.iter().map(Into::into).collect(),
        markup_percentage: settings.default_markup_percentage,
    })?;

    tracing::info!(
        user_id = %auth.user_id,
        template_id = %template_id,
        usage_count = template.usage_count,
        "Template used"
    );

    Ok(Json(DataResponse::new(TemplateUseResponse {
        template,
        pricing_preview,
    })))
}

#[cfg(test)]
mod tests {
    use crate::app::tests::{bearer, send, test_state};
    use crate::services::ProviderRegistry;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn create_requires_name_and_work_types() {
        let (status, _, body) = send(
            test_state(ProviderRegistry::new()),
            Method::POST,
            "/templates",
            Some(bearer()),
            Some(json!({"name": "", "work_types": [], "scope_text": "Swap panel"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0], "name is required");
        assert_eq!(body["details"][1], "work_types must contain at least one work type");
    }

    #[tokio::test]
    async fn update_rejects_negative_material_cost() {
        let (status, _, body) = send(
            test_state(ProviderRegistry::new()),
            Method::PATCH,
            &format!("/templates/{}", uuid::Uuid::new_v4()),
            Some(bearer()),
            Some(json!({"materials": [{"description": "Wire", "unit_cost": -1}]})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0], "materials[0].unit_cost must be greater than or equal to 0");
    }

    #[tokio::test]
    async fn malformed_template_id_is_rejected() {
        let (status, _, _) = send(
            test_state(ProviderRegistry::new()),
            Method::GET,
            "/templates/not-a-uuid",
            Some(bearer()),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
