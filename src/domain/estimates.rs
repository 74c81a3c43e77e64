//! Estimate domain types
//!
//! An estimate is a priced quote for one client job, owned by one user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ai::AiPricingData;
use super::pricing::{check_amount, CalculationInput, MaterialInput, PricingBreakdown};
use crate::api::PaginationParams;

/// Category of electrical work
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    ResidentialPanelUpgrade,
    ResidentialRewiring,
    ResidentialOutlets,
    ServiceCall,
    Repair,
    CommercialOffice,
    CommercialRetail,
    CommercialIndustrial,
}

impl WorkType {
    pub const ALL: [WorkType; 8] = [
        Self::ResidentialPanelUpgrade,
        Self::ResidentialRewiring,
        Self::ResidentialOutlets,
        Self::ServiceCall,
        Self::Repair,
        Self::CommercialOffice,
        Self::CommercialRetail,
        Self::CommercialIndustrial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResidentialPanelUpgrade => "residential_panel_upgrade",
            Self::ResidentialRewiring => "residential_rewiring",
            Self::ResidentialOutlets => "residential_outlets",
            Self::ServiceCall => "service_call",
            Self::Repair => "repair",
            Self::CommercialOffice => "commercial_office",
            Self::CommercialRetail => "commercial_retail",
            Self::CommercialIndustrial => "commercial_industrial",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.as_str() == s)
    }

    /// Human-readable label, e.g. "residential panel upgrade".
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

/// Estimate lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EstimateStatus {
    #[default]
    Draft,
    Sent,
    Approved,
    Rejected,
}

impl EstimateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "sent" => Self::Sent,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::Draft,
        }
    }
}

/// Request DTO for creating an estimate
///
/// Pricing is sent as calculator inputs; the breakdown is always computed
/// server-side. Rate and markup fall back to the user's settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEstimateRequest {
    pub client_name: String,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
    pub project_address: String,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    pub work_type: WorkType,
    pub scope_of_work: String,
    #[serde(default)]
    pub labor_hours: f64,
    #[serde(default)]
    pub hourly_rate: Option<f64>,
    #[serde(default)]
    pub materials: Vec<MaterialInput>,
    #[serde(default)]
    pub markup_percentage: Option<f64>,
    #[serde(default)]
    pub ai_pricing: Option<AiPricingData>,
    #[serde(default)]
    pub status: EstimateStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateEstimateRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        check_required(&mut errors, "client_name", &self.client_name, 200);
        check_required(&mut errors, "project_address", &self.project_address, 500);
        check_required(&mut errors, "city", &self.city, 200);
        check_required(&mut errors, "scope_of_work", &self.scope_of_work, 10_000);
        check_email(&mut errors, self.client_email.as_deref());
        check_state(&mut errors, self.state.as_deref());

        errors.extend(
            CalculationInput {
                labor_hours: self.labor_hours,
                hourly_rate: self.hourly_rate.unwrap_or(0.0),
                material_items: self.materials.clone(),
                markup_percentage: self.markup_percentage.unwrap_or(0.0),
            }
            .validate(),
        );

        errors
    }

    /// Calculator input with rate and markup resolved against defaults.
    pub fn pricing_input(&self, default_rate: f64, default_markup: f64) -> CalculationInput {
        CalculationInput {
            labor_hours: self.labor_hours,
            hourly_rate: self.hourly_rate.unwrap_or(default_rate),
            material_items: self.materials.clone(),
            markup_percentage: self.markup_percentage.unwrap_or(default_markup),
        }
    }
}

/// Request DTO for updating an estimate (all fields optional)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEstimateRequest {
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub project_address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub work_type: Option<WorkType>,
    #[serde(default)]
    pub scope_of_work: Option<String>,
    #[serde(default)]
    pub labor_hours: Option<f64>,
    #[serde(default)]
    pub hourly_rate: Option<f64>,
    #[serde(default)]
    pub materials: Option<Vec<MaterialInput>>,
    #[serde(default)]
    pub markup_percentage: Option<f64>,
    #[serde(default)]
    pub status: Option<EstimateStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl UpdateEstimateRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Some(name) = &self.client_name {
            check_required(&mut errors, "client_name", name, 200);
        }
        if let Some(address) = &self.project_address {
            check_required(&mut errors, "project_address", address, 500);
        }
        if let Some(city) = &self.city {
            check_required(&mut errors, "city", city, 200);
        }
        if let Some(scope) = &self.scope_of_work {
            check_required(&mut errors, "scope_of_work", scope, 10_000);
        }
        check_email(&mut errors, self.client_email.as_deref());
        check_state(&mut errors, self.state.as_deref());

        if let Some(hours) = self.labor_hours {
            check_amount(&mut errors, "labor_hours", hours);
        }
        if let Some(rate) = self.hourly_rate {
            check_amount(&mut errors, "hourly_rate", rate);
        }
        if let Some(markup) = self.markup_percentage {
            check_amount(&mut errors, "markup_percentage", markup);
        }
        if let Some(materials) = &self.materials {
            for (idx, item) in materials.iter().enumerate() {
                check_amount(&mut errors, &format!("materials[{}].quantity", idx), item.quantity);
                check_amount(&mut errors, &format!("materials[{}].unit_cost", idx), item.unit_cost);
            }
        }

        errors
    }

    /// True when the update touches any calculator input.
    pub fn changes_pricing(&self) -> bool {
        self.labor_hours.is_some()
            || self.hourly_rate.is_some()
            || self.materials.is_some()
            || self.markup_percentage.is_some()
    }

    /// Merge the changed pricing inputs over the current breakdown's inputs.
    pub fn merged_pricing_input(&self, current: &PricingBreakdown) -> CalculationInput {
        let base = current.to_input();
        CalculationInput {
            labor_hours: self.labor_hours.unwrap_or(base.labor_hours),
            hourly_rate: self.hourly_rate.unwrap_or(base.hourly_rate),
            material_items: self.materials.clone().unwrap_or(base.material_items),
            markup_percentage: self.markup_percentage.unwrap_or(base.markup_percentage),
        }
    }
}

/// Response DTO for estimate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateResponse {
    pub id: Uuid,
    pub client_name: String,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub project_address: String,
    pub city: String,
    pub state: Option<String>,
    pub work_type: WorkType,
    pub scope_of_work: String,
    pub pricing: PricingBreakdown,
    pub ai_pricing: Option<AiPricingData>,
    pub status: EstimateStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query parameters for listing estimates
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EstimateListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    #[serde(default)]
    pub status: Option<EstimateStatus>,
}

impl EstimateListQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Request DTO for bulk import
#[derive(Debug, Clone, Deserialize)]
pub struct SyncEstimatesRequest {
    pub estimates: Vec<CreateEstimateRequest>,
}

/// Result of a bulk import
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncEstimatesResult {
    pub imported: u32,
    pub skipped: u32,
    pub errors: Vec<String>,
}

fn check_required(errors: &mut Vec<String>, field: &str, value: &str, max_len: usize) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(format!("{} is required", field));
    } else if trimmed.chars().count() > max_len {
        errors.push(format!("{} must be at most {} characters", field, max_len));
    }
}

fn check_email(errors: &mut Vec<String>, email: Option<&str>) {
    // Empty string is allowed and means "no email"
    if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) {
        let valid = email
            .split_once('@')
            .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
            .unwrap_or(false);
        if !valid {
            errors.push("client_email must be a valid email address".to_string());
        }
    }
}

fn check_state(errors: &mut Vec<String>, state: Option<&str>) {
    if let Some(state) = state {
        if state.trim().chars().count() > 2 {
            errors.push("state must be a two-letter code".to_string());
        }
    }
}

/// Normalize an optional state code for storage.
pub fn normalize_state(state: Option<&str>) -> Option<String> {
    state
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::calculator;

    fn create_request() -> CreateEstimateRequest {
        serde_json::from_value(serde_json::json!({
            "client_name": "Jane Doe",
            "project_address": "12 Main St",
            "city": "Los Angeles",
            "work_type": "residential_panel_upgrade",
            "scope_of_work": "Upgrade 100A panel to 200A",
            "labor_hours": 8.0,
            "materials": [{"description": "Breaker", "quantity": 2.0, "unit_cost": 15.0}]
        }))
        .unwrap()
    }

    #[test]
    fn work_type_label_replaces_underscores() {
        assert_eq!(
            WorkType::ResidentialPanelUpgrade.label(),
            "residential panel upgrade"
        );
        for work_type in WorkType::ALL {
            assert_eq!(WorkType::from_str(work_type.as_str()), Some(work_type));
        }
    }

    #[test]
    fn unknown_status_reads_as_draft() {
        assert_eq!(EstimateStatus::from_db("approved"), EstimateStatus::Approved);
        assert_eq!(EstimateStatus::from_db("archived"), EstimateStatus::Draft);
    }

    #[test]
    fn create_defaults_rate_and_markup() {
        let req = create_request();
        assert!(req.validate().is_empty());
        assert_eq!(req.status, EstimateStatus::Draft);

        let input = req.pricing_input(75.0, 20.0);
        assert_eq!(input.hourly_rate, 75.0);
        assert_eq!(input.markup_percentage, 20.0);

        let breakdown = calculator::compute(&input);
        assert!((breakdown.total - 756.0).abs() < 1e-9);
    }

    #[test]
    fn create_rejects_bad_contact_fields() {
        let mut req = create_request();
        req.client_email = Some("not-an-email".into());
        req.state = Some("Calif".into());
        req.client_name = "  ".into();

        let errors = req.validate();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn empty_email_is_allowed() {
        let mut req = create_request();
        req.client_email = Some(String::new());
        assert!(req.validate().is_empty());
    }

    #[test]
    fn update_merges_only_changed_pricing_inputs() {
        let current = calculator::compute(&create_request().pricing_input(75.0, 20.0));

        let update = UpdateEstimateRequest {
            markup_percentage: Some(10.0),
            ..Default::default()
        };
        assert!(update.changes_pricing());

        let merged = update.merged_pricing_input(&current);
        assert_eq!(merged.labor_hours, 8.0);
        assert_eq!(merged.hourly_rate, 75.0);
        assert_eq!(merged.material_items.len(), 1);
        assert_eq!(merged.markup_percentage, 10.0);

        let repriced = calculator::compute(&merged);
        assert!((repriced.total - 693.0).abs() < 1e-9);
    }

    #[test]
    fn update_without_pricing_fields_keeps_pricing() {
        let update = UpdateEstimateRequest {
            notes: Some("Call before arrival".into()),
            ..Default::default()
        };
        assert!(!update.changes_pricing());
        assert!(update.validate().is_empty());
    }

    #[test]
    fn state_is_normalized() {
        assert_eq!(normalize_state(Some(" ca ")), Some("CA".to_string()));
        assert_eq!(normalize_state(Some("")), None);
        assert_eq!(normalize_state(None), None);
    }
}
