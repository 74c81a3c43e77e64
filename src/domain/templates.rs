//! Scope template domain types
//!
//! Reusable presets of scope text, labor hours and materials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::estimates::WorkType;
use super::pricing::{check_amount, MaterialInput, PricingBreakdown};

/// Material preset stored on a template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateMaterial {
    pub description: String,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default)]
    pub unit_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_quantity() -> f64 {
    1.0
}

fn default_labor_hours() -> f64 {
    8.0
}

impl From<&TemplateMaterial> for MaterialInput {
    fn from(m: &TemplateMaterial) -> Self {
        Self {
            description: m.description.clone(),
            quantity: m.quantity,
            unit_cost: m.unit_cost,
        }
    }
}

/// Request DTO for creating a template
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub work_types: Vec<WorkType>,
    pub scope_text: String,
    #[serde(default = "default_labor_hours")]
    pub suggested_labor_hours: f64,
    #[serde(default)]
    pub materials: Vec<TemplateMaterial>,
}

impl CreateTemplateRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        check_name(&mut errors, &self.name);
        check_description(&mut errors, self.description.as_deref());
        check_work_types(&mut errors, &self.work_types);
        check_scope_text(&mut errors, &self.scope_text);
        check_amount(&mut errors, "suggested_labor_hours", self.suggested_labor_hours);
        check_materials(&mut errors, &self.materials);
        errors
    }
}

/// Request DTO for updating a template
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTemplateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub work_types: Option<Vec<WorkType>>,
    #[serde(default)]
    pub scope_text: Option<String>,
    #[serde(default)]
    pub suggested_labor_hours: Option<f64>,
    #[serde(default)]
    pub materials: Option<Vec<TemplateMaterial>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl UpdateTemplateRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            check_name(&mut errors, name);
        }
        check_description(&mut errors, self.description.as_deref());
        if let Some(work_types) = &self.work_types {
            check_work_types(&mut errors, work_types);
        }
        if let Some(scope_text) = &self.scope_text {
            check_scope_text(&mut errors, scope_text);
        }
        if let Some(hours) = self.suggested_labor_hours {
            check_amount(&mut errors, "suggested_labor_hours", hours);
        }
        if let Some(materials) = &self.materials {
            check_materials(&mut errors, materials);
        }
        errors
    }
}

/// Response DTO for template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub work_types: Vec<WorkType>,
    pub scope_text: String,
    pub suggested_labor_hours: f64,
    pub materials: Vec<TemplateMaterial>,
    pub is_active: bool,
    pub usage_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response DTO for using a template
///
/// Carries the updated template plus a pricing preview built from its labor
/// hours and materials at the user's default rate and markup.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateUseResponse {
    pub template: TemplateResponse,
    pub pricing_preview: PricingBreakdown,
}

/// Sort order for template listings
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSort {
    #[default]
    CreatedAt,
    UsageCount,
    Name,
}

impl TemplateSort {
    pub fn order_by(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at DESC",
            Self::UsageCount => "usage_count DESC, created_at DESC",
            Self::Name => "name ASC",
        }
    }
}

/// Query parameters for listing templates
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateListQuery {
    #[serde(default)]
    pub work_type: Option<WorkType>,
    #[serde(default = "default_true")]
    pub active_only: bool,
    #[serde(default)]
    pub sort_by: TemplateSort,
}

/// Query parameters for deleting a template
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteTemplateQuery {
    #[serde(default)]
    pub hard: bool,
}

fn default_true() -> bool {
    true
}

fn check_name(errors: &mut Vec<String>, name: &str) {
    let len = name.trim().chars().count();
    if len == 0 {
        errors.push("name is required".to_string());
    } else if len > 200 {
        errors.push("name must be at most 200 characters".to_string());
    }
}

fn check_description(errors: &mut Vec<String>, description: Option<&str>) {
    if description.map(|d| d.chars().count() > 500).unwrap_or(false) {
        errors.push("description must be at most 500 characters".to_string());
    }
}

fn check_work_types(errors: &mut Vec<String>, work_types: &[WorkType]) {
    if work_types.is_empty() {
        errors.push("work_types must contain at least one work type".to_string());
    }
}

fn check_scope_text(errors: &mut Vec<String>, scope_text: &str) {
    let len = scope_text.trim().chars().count();
    if len == 0 {
        errors.push("scope_text is required".to_string());
    } else if len > 5000 {
        errors.push("scope_text must be at most 5000 characters".to_string());
    }
}

fn check_materials(errors: &mut Vec<String>, materials: &[TemplateMaterial]) {
    for (idx, m) in materials.iter().enumerate() {
        let len = m.description.trim().chars().count();
        if len == 0 || len > 200 {
            errors.push(format!(
                "materials[{}].description must be 1-200 characters",
                idx
            ));
        }
        if m.notes.as_deref().map(|n| n.chars().count() > 500).unwrap_or(false) {
            errors.push(format!("materials[{}].notes must be at most 500 characters", idx));
        }
        check_amount(errors, &format!("materials[{}].quantity", idx), m.quantity);
        check_amount(errors, &format!("materials[{}].unit_cost", idx), m.unit_cost);
    }
}
