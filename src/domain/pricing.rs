//! Pricing domain types
//!
//! Line items and the priced breakdown attached to every estimate. All totals
//! are derived by `services::calculator`; nothing here is set by hand.

use serde::{Deserialize, Serialize};

/// Line item kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    Labor,
    Material,
}

/// A single priced line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub id: String,
    pub description: String,
    pub quantity: f64,
    pub unit_cost: f64,
    pub total: f64,
    pub kind: LineItemKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LaborEstimate {
    pub hours: f64,
    pub hourly_rate: f64,
    pub total: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialEstimate {
    pub items: Vec<LineItem>,
    pub subtotal: f64,
}

/// Full pricing breakdown for an estimate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingBreakdown {
    pub labor: LaborEstimate,
    pub materials: MaterialEstimate,
    pub subtotal: f64,
    pub markup_percentage: f64,
    pub markup_amount: f64,
    pub total: f64,
}

/// Material input before pricing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialInput {
    pub description: String,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default)]
    pub unit_cost: f64,
}

fn default_quantity() -> f64 {
    1.0
}

impl From<&LineItem> for MaterialInput {
    fn from(item: &LineItem) -> Self {
        Self {
            description: item.description.clone(),
            quantity: item.quantity,
            unit_cost: item.unit_cost,
        }
    }
}

/// Request DTO for the calculator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculationInput {
    pub labor_hours: f64,
    pub hourly_rate: f64,
    #[serde(default)]
    pub material_items: Vec<MaterialInput>,
    pub markup_percentage: f64,
}

impl CalculationInput {
    /// Collect every out-of-range field.
    ///
    /// Negative and non-finite values are rejected; zero is allowed everywhere.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        check_amount(&mut errors, "labor_hours", self.labor_hours);
        check_amount(&mut errors, "hourly_rate", self.hourly_rate);
        check_amount(&mut errors, "markup_percentage", self.markup_percentage);

        for (idx, item) in self.material_items.iter().enumerate() {
            check_amount(
                &mut errors,
                &format!("material_items[{}].quantity", idx),
                item.quantity,
            );
            check_amount(
                &mut errors,
                &format!("material_items[{}].unit_cost", idx),
                item.unit_cost,
            );
        }

        errors
    }
}

pub(crate) fn check_amount(errors: &mut Vec<String>, field: &str, value: f64) {
    if !value.is_finite() {
        errors.push(format!("{} must be a finite number", field));
    } else if value < 0.0 {
        errors.push(format!("{} must be greater than or equal to 0", field));
    }
}

impl PricingBreakdown {
    /// Totals that overflowed. JSON has no infinity, so these could not be stored.
    pub fn validate_totals(&self) -> Vec<String> {
        [
            ("labor.total", self.labor.total),
            ("materials.subtotal", self.materials.subtotal),
            ("subtotal", self.subtotal),
            ("markup_amount", self.markup_amount),
            ("total", self.total),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_finite())
        .map(|(field, _)| format!("{} exceeds the supported range", field))
        .collect()
    }

    /// Recover the calculator input this breakdown was built from.
    pub fn to_input(&self) -> CalculationInput {
        CalculationInput {
            labor_hours: self.labor.hours,
            hourly_rate: self.labor.hourly_rate,
            material_items: self.materials.items.iter().map(Into::into).collect(),
            markup_percentage: self.markup_percentage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_zeroes() {
        let input = CalculationInput {
            labor_hours: 0.0,
            hourly_rate: 0.0,
            material_items: vec![MaterialInput {
                description: "Wire".into(),
                quantity: 0.0,
                unit_cost: 0.0,
            }],
            markup_percentage: 0.0,
        };
        assert!(input.validate().is_empty());
    }

    #[test]
    fn validate_reports_each_bad_field() {
        let input = CalculationInput {
            labor_hours: -1.0,
            hourly_rate: f64::NAN,
            material_items: vec![MaterialInput {
                description: "Breaker".into(),
                quantity: 2.0,
                unit_cost: -15.0,
            }],
            markup_percentage: 20.0,
        };

        let errors = input.validate();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("labor_hours"));
        assert!(errors[1].starts_with("hourly_rate"));
        assert!(errors[2].starts_with("material_items[0].unit_cost"));
    }

    #[test]
    fn material_quantity_defaults_to_one() {
        let item: MaterialInput =
            serde_json::from_str(r#"{"description":"Outlet box"}"#).unwrap();
        assert_eq!(item.quantity, 1.0);
        assert_eq!(item.unit_cost, 0.0);
    }
}
