//! Estimate routes
//!
//! CRUD, bulk import and export for a user's estimates. Pricing is always
//! derived server-side from calculator inputs.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use sqlx::{types::Json as DbJson, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use super::settings::load_user_settings;
use crate::api::{Created, DataResponse, NoContent, Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::ai::AiPricingData;
use crate::domain::estimates::{
    normalize_state, CreateEstimateRequest, EstimateListQuery, EstimateResponse, EstimateStatus,
    SyncEstimatesRequest, SyncEstimatesResult, UpdateEstimateRequest, WorkType,
};
use crate::domain::pricing::PricingBreakdown;
use crate::error::ApiError;
use crate::services::calculator;
use crate::services::export::{self, ExportQuery};

const ESTIMATE_COLUMNS: &str = "id, client_name, client_email, client_phone, project_address, \
     city, state, work_type, scope_of_work, pricing, ai_pricing, status, notes, \
     created_at, updated_at";

/// Database row for estimate
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EstimateRow {
    id: Uuid,
    client_name: String,
    client_email: Option<String>,
    client_phone: Option<String>,
    project_address: String,
    city: String,
    state: Option<String>,
    work_type: String,
    scope_of_work: String,
    pricing: DbJson<PricingBreakdown>,
    ai_pricing: Option<DbJson<AiPricingData>>,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EstimateRow> for EstimateResponse {
    type Error = ApiError;

    fn try_from(row: EstimateRow) -> Result<Self, Self::Error> {
        let work_type = WorkType::from_str(&row.work_type).ok_or_else(|| {
            ApiError::internal(format!("Unknown work type in database: {}", row.work_type))
        })?;

        Ok(Self {
            id: row.id,
            client_name: row.client_name,
            client_email: row.client_email,
            client_phone: row.client_phone,
            project_address: row.project_address,
            city: row.city,
            state: row.state,
            work_type,
            scope_of_work: row.scope_of_work,
            pricing: row.pricing.0,
            ai_pricing: row.ai_pricing.map(|j| j.0),
            status: EstimateStatus::from_db(&row.status),
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Fetch one estimate owned by `user_id`.
pub(crate) async fn fetch_estimate(
    db: &PgPool,
    user_id: Uuid,
    estimate_id: Uuid,
) -> Result<EstimateResponse, ApiError> {
    let row = sqlx::query_as::<_, EstimateRow>(&format!(
        "SELECT {} FROM estimates WHERE id = $1 AND user_id = $2",
        ESTIMATE_COLUMNS
    ))
    .bind(estimate_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| ApiError::not_found("Estimate not found"))?;

    row.try_into()
}

/// Store an estimate's AI research on it.
pub(crate) async fn attach_ai_pricing(
    db: &PgPool,
    user_id: Uuid,
    estimate_id: Uuid,
    data: &AiPricingData,
) -> Result<(), ApiError> {
    let result = sqlx::query(
        "UPDATE estimates SET ai_pricing = $3, updated_at = NOW() WHERE id = $1 AND user_id = $2",
    )
    .bind(estimate_id)
    .bind(user_id)
    .bind(DbJson(data))
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Estimate not found"));
    }

    Ok(())
}

async fn insert_estimate(
    db: &PgPool,
    user_id: Uuid,
    req: &CreateEstimateRequest,
    pricing: &PricingBreakdown,
) -> Result<EstimateRow, sqlx::Error> {
    sqlx::query_as::<_, EstimateRow>(&format!(
        r#"
        INSERT INTO estimates (
            id, user_id, client_name, client_email, client_phone, project_address,
            city, state, work_type, scope_of_work, pricing, ai_pricing, status, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING {}
        "#,
        ESTIMATE_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(req.client_name.trim())
    .bind(non_empty(req.client_email.as_deref()))
    .bind(non_empty(req.client_phone.as_deref()))
    .bind(req.project_address.trim())
    .bind(req.city.trim())
    .bind(normalize_state(req.state.as_deref()))
    .bind(req.work_type.as_str())
    .bind(&req.scope_of_work)
    .bind(DbJson(pricing))
    .bind(req.ai_pricing.as_ref().map(DbJson))
    .bind(req.status.as_str())
    .bind(non_empty(req.notes.as_deref()))
    .fetch_one(db)
    .await
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Price a create request, falling back to the user's defaults for rate and markup.
async fn price_new_estimate(
    db: &PgPool,
    user_id: Uuid,
    req: &CreateEstimateRequest,
) -> Result<PricingBreakdown, ApiError> {
    let (default_rate, default_markup) = match (req.hourly_rate, req.markup_percentage) {
        (Some(rate), Some(markup)) => (rate, markup),
        _ => {
            let settings = load_user_settings(db, user_id).await?;
            (settings.default_hourly_rate, settings.default_markup_percentage)
        }
    };

    calculator::checked_compute(&req.pricing_input(default_rate, default_markup))
}

/// GET /estimates
///
/// List the user's estimates, newest first.
pub async fn list_estimates(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Query(query): Query<EstimateListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let pagination: PaginationParams = query.pagination();
    let status = query.status.map(|s| s.as_str());

    tracing::debug!(
        user_id = %auth.user_id,
        page = pagination.page(),
        per_page = pagination.per_page(),
        status = ?status,
        "Listing estimates"
    );

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM estimates WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2)",
    )
    .bind(auth.user_id)
    .bind(status)
    .fetch_one(&state.db)
    .await?;

    let rows = sqlx::query_as::<_, EstimateRow>(&format!(
        r#"
        SELECT {}
        FROM estimates
        WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
        ESTIMATE_COLUMNS
    ))
    .bind(auth.user_id)
    .bind(status)
    .bind(pagination.limit() as i64)
    .bind(pagination.offset() as i64)
    .fetch_all(&state.db)
    .await?;

    let data = rows
        .into_iter()
        .map(EstimateResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Paginated::new(data, &pagination, total as u64))
}

/// POST /estimates
///
/// Create an estimate.
pub async fn create_estimate(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<CreateEstimateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ApiError::check(req.validate())?;

    let pricing = price_new_estimate(&state.db, auth.user_id, &req).await?;

    let row = insert_estimate(&state.db, auth.user_id, &req, &pricing).await?;
    let estimate = EstimateResponse::try_from(row)?;

    tracing::info!(
        user_id = %auth.user_id,
        estimate_id = %estimate.id,
        total = estimate.pricing.total,
        "Estimate created"
    );

    Ok(Created(estimate))
}

/// GET /estimates/:id
pub async fn get_estimate(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(estimate_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let estimate = fetch_estimate(&state.db, auth.user_id, estimate_id).await?;
    Ok(Json(DataResponse::new(estimate)))
}

/// PATCH /estimates/:id
///
/// Partial update. Changing any pricing input recomputes the whole breakdown.
pub async fn update_estimate(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(estimate_id): Path<Uuid>,
    Json(req): Json<UpdateEstimateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ApiError::check(req.validate())?;

    let pricing = if req.changes_pricing() {
        let current = fetch_estimate(&state.db, auth.user_id, estimate_id).await?.pricing;
        Some(match &req.materials {
            Some(_) => calculator::checked_compute(&req.merged_pricing_input(&current))?,
            // Existing line items keep their ids
            None => calculator::checked(calculator::recalculate(
                req.labor_hours.unwrap_or(current.labor.hours),
                req.hourly_rate.unwrap_or(current.labor.hourly_rate),
                current.materials.items,
                req.markup_percentage.unwrap_or(current.markup_percentage),
            ))?,
        })
    } else {
        None
    };

    let row = sqlx::query_as::<_, EstimateRow>(&format!(
        r#"
        UPDATE estimates SET
            client_name = COALESCE($3, client_name),
            client_email = COALESCE($4, client_email),
            client_phone = COALESCE($5, client_phone),
            project_address = COALESCE($6, project_address),
            city = COALESCE($7, city),
            state = COALESCE($8, state),
            work_type = COALESCE($9, work_type),
            scope_of_work = COALESCE($10, scope_of_work),
            pricing = COALESCE($11, pricing),
            status = COALESCE($12, status),
            notes = COALESCE($13, notes),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING {}
        "#,
        ESTIMATE_COLUMNS
    ))
    .bind(estimate_id)
    .bind(auth.user_id)
    .bind(req.client_name.as_deref().map(str::trim))
    .bind(req.client_email.as_deref().map(str::trim))
    .bind(req.client_phone.as_deref().map(str::trim))
    .bind(req.project_address.as_deref().map(str::trim))
    .bind(req.city.as_deref().map(str::trim))
    .bind(normalize_state(req.state.as_deref()))
    .bind(req.work_type.map(|w| w.as_str()))
    .bind(req.scope_of_work.as_deref())
    .bind(pricing.as_ref().map(DbJson))
    .bind(req.status.map(|s| s.as_str()))
    .bind(req.notes.as_deref())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Estimate not found"))?;

    tracing::info!(
        user_id = %auth.user_id,
        estimate_id = %estimate_id,
        repriced = pricing.is_some(),
        "Estimate updated"
    );

    Ok(Json(DataResponse::new(EstimateResponse::try_from(row)?)))
}

/// DELETE /estimates/:id
pub async fn delete_estimate(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(estimate_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM estimates WHERE id = $1 AND user_id = $2")
        .bind(estimate_id)
        .bind(auth.user_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Estimate not found"));
    }

    tracing::info!(user_id = %auth.user_id, estimate_id = %estimate_id, "Estimate deleted");

    Ok(NoContent)
}

/// POST /estimates/sync
///
/// Bulk import. Estimates matching an existing (client name, project address)
/// pair are skipped; per-estimate failures are reported without aborting.
pub async fn sync_estimates(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(req): Json<SyncEstimatesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut result = SyncEstimatesResult::default();
    let mut defaults = None;

    for estimate in &req.estimates {
        let errors = estimate.validate();
        if !errors.is_empty() {
            result.errors.push(format!(
                "Failed to import estimate for {}: {}",
                estimate.client_name,
                errors.join("; ")
            ));
            continue;
        }

        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM estimates
                WHERE user_id = $1 AND client_name = $2 AND project_address = $3
            )
            "#,
        )
        .bind(auth.user_id)
        .bind(estimate.client_name.trim())
        .bind(estimate.project_address.trim())
        .fetch_one(&state.db)
        .await;

        match exists {
            Ok(true) => {
                result.skipped += 1;
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, client_name = %estimate.client_name, "Estimate duplicate check failed");
                result.errors.push(format!(
                    "Failed to import estimate for {}: {}",
                    estimate.client_name, e
                ));
                continue;
            }
        }

        let (rate, markup) = match defaults {
            Some(d) => d,
            None => match load_user_settings(&state.db, auth.user_id).await {
                Ok(settings) => {
                    let d = (settings.default_hourly_rate, settings.default_markup_percentage);
                    defaults = Some(d);
                    d
                }
                Err(e) => {
                    result.errors.push(format!(
                        "Failed to import estimate for {}: {}",
                        estimate.client_name, e
                    ));
                    continue;
                }
            },
        };
        let pricing = match calculator::checked_compute(&estimate.pricing_input(rate, markup)) {
            Ok(pricing) => pricing,
            Err(e) => {
                result.errors.push(format!(
                    "Failed to import estimate for {}: {}",
                    estimate.client_name, e
                ));
                continue;
            }
        };

        match insert_estimate(&state.db, auth.user_id, estimate, &pricing).await {
            Ok(_) => result.imported += 1,
            Err(e) => {
                tracing::warn!(error = %e, client_name = %estimate.client_name, "Estimate import failed");
                result.errors.push(format!(
                    "Failed to import estimate for {}: {}",
                    estimate.client_name, e
                ));
            }
        }
    }

    tracing::info!(
        user_id = %auth.user_id,
        imported = result.imported,
        skipped = result.skipped,
        failed = result.errors.len(),
        "Estimates synced"
    );

    Ok(Json(DataResponse::new(result)))
}

/// GET /estimates/:id/export
///
/// Download the estimate as CSV.
pub async fn export_estimate(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(estimate_id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let estimate = fetch_estimate(&state.db, auth.user_id, estimate_id).await?;

    let sheets = export::build_sheets(&estimate, query.section);
    if sheets.is_empty() {
        return Err(ApiError::not_found("Estimate has no AI pricing research"));
    }

    let filename = export::export_filename(&estimate.client_name, Utc::now().date_naive());
    tracing::info!(
        user_id = %auth.user_id,
        estimate_id = %estimate_id,
        section = ?query.section,
        "Estimate exported"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        export::render_csv(&sheets),
    ))
}
