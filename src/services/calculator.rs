//! Pricing calculator.
//!
//! Pure functions turning labor and material inputs into a `PricingBreakdown`.
//! `compute` does not validate; HTTP entry points go through `checked_compute`.

use crate::domain::pricing::{
    CalculationInput, LaborEstimate, LineItem, LineItemKind, MaterialEstimate, MaterialInput,
    PricingBreakdown,
};
use crate::error::ApiError;

/// Build a full breakdown from calculator inputs.
///
/// Material ids are index based (`mat-0`, `mat-1`, ...), so identical inputs
/// always produce identical output.
pub fn compute(input: &CalculationInput) -> PricingBreakdown {
    let items = input
        .material_items
        .iter()
        .enumerate()
        .map(|(idx, item)| material_line(idx, item))
        .collect();

    assemble(input.labor_hours, input.hourly_rate, items, input.markup_percentage)
}

/// Validate, then compute.
pub fn checked_compute(input: &CalculationInput) -> Result<PricingBreakdown, ApiError> {
    let errors = input.validate();
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }
    checked(compute(input))
}

/// Reject a breakdown whose totals are not finite.
pub fn checked(breakdown: PricingBreakdown) -> Result<PricingBreakdown, ApiError> {
    ApiError::check(breakdown.validate_totals())?;
    Ok(breakdown)
}

/// Re-derive a breakdown from line items that already carry ids.
///
/// Item totals are recomputed from quantity and unit cost; ids are kept.
pub fn recalculate(
    labor_hours: f64,
    hourly_rate: f64,
    items: Vec<LineItem>,
    markup_percentage: f64,
) -> PricingBreakdown {
    let items = items
        .into_iter()
        .map(|item| LineItem {
            total: item.quantity * item.unit_cost,
            ..item
        })
        .collect();

    assemble(labor_hours, hourly_rate, items, markup_percentage)
}

fn material_line(idx: usize, item: &MaterialInput) -> LineItem {
    LineItem {
        id: format!("mat-{}", idx),
        description: item.description.clone(),
        quantity: item.quantity,
        unit_cost: item.unit_cost,
        total: item.quantity * item.unit_cost,
        kind: LineItemKind::Material,
    }
}

fn assemble(
    labor_hours: f64,
    hourly_rate: f64,
    items: Vec<LineItem>,
    markup_percentage: f64,
) -> PricingBreakdown {
    let labor_total = labor_hours * hourly_rate;
    let materials_subtotal: f64 = items.iter().map(|item| item.total).sum();
    let subtotal = labor_total + materials_subtotal;
    let markup_amount = subtotal * (markup_percentage / 100.0);

    PricingBreakdown {
        labor: LaborEstimate {
            hours: labor_hours,
            hourly_rate,
            total: labor_total,
            description: labor_description(labor_hours, hourly_rate),
        },
        materials: MaterialEstimate {
            items,
            subtotal: materials_subtotal,
        },
        subtotal,
        markup_percentage,
        markup_amount,
        total: subtotal + markup_amount,
    }
}

/// "8 hours @ $75.00/hr"
pub fn labor_description(hours: f64, hourly_rate: f64) -> String {
    format!("{} hours @ ${:.2}/hr", hours, hourly_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn material(description: &str, quantity: f64, unit_cost: f64) -> MaterialInput {
        MaterialInput {
            description: description.to_string(),
            quantity,
            unit_cost,
        }
    }

    fn input(hours: f64, rate: f64, items: Vec<MaterialInput>, markup: f64) -> CalculationInput {
        CalculationInput {
            labor_hours: hours,
            hourly_rate: rate,
            material_items: items,
            markup_percentage: markup,
        }
    }

    #[test]
    fn panel_upgrade_scenario() {
        let breakdown = compute(&input(8.0, 75.0, vec![material("Breaker", 2.0, 15.0)], 20.0));

        assert!((breakdown.labor.total - 600.0).abs() < EPS);
        assert!((breakdown.materials.subtotal - 30.0).abs() < EPS);
        assert!((breakdown.subtotal - 630.0).abs() < EPS);
        assert!((breakdown.markup_amount - 126.0).abs() < EPS);
        assert!((breakdown.total - 756.0).abs() < EPS);
        assert_eq!(breakdown.labor.description, "8 hours @ $75.00/hr");
        assert_eq!(breakdown.materials.items[0].kind, LineItemKind::Material);
    }

    #[test]
    fn total_matches_closed_form() {
        let cases = [
            (0.0, 0.0, vec![], 0.0),
            (2.5, 110.0, vec![material("Wire 12/2", 250.0, 0.42)], 15.0),
            (
                16.0,
                92.5,
                vec![
                    material("GFCI outlet", 6.0, 18.75),
                    material("Conduit", 40.0, 3.1),
                    material("Box", 6.0, 2.2),
                ],
                35.5,
            ),
            (1.0, 1.0, vec![material("Fuse", 3.0, 1.0)], 100.0),
        ];

        for (hours, rate, items, markup) in cases {
            let materials: f64 = items.iter().map(|m| m.quantity * m.unit_cost).sum();
            let expected = (hours * rate + materials) * (1.0 + markup / 100.0);

            let breakdown = compute(&input(hours, rate, items, markup));
            assert!(
                (breakdown.total - expected).abs() < 1e-6,
                "expected {} got {}",
                expected,
                breakdown.total
            );
        }
    }

    #[test]
    fn identical_inputs_give_identical_breakdowns() {
        let calc = input(
            4.0,
            80.0,
            vec![material("Breaker", 1.0, 12.0), material("Breaker", 1.0, 12.0)],
            10.0,
        );
        assert_eq!(compute(&calc), compute(&calc));
    }

    #[test]
    fn material_ids_are_unique_within_a_call() {
        let breakdown = compute(&input(
            1.0,
            1.0,
            vec![material("A", 1.0, 1.0), material("A", 1.0, 1.0), material("B", 1.0, 1.0)],
            0.0,
        ));
        let ids: Vec<&str> = breakdown.materials.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["mat-0", "mat-1", "mat-2"]);
    }

    #[test]
    fn checked_compute_rejects_negative_inputs() {
        let err = checked_compute(&input(-1.0, 75.0, vec![], 20.0)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref details) if details.len() == 1));

        assert!(checked_compute(&input(1.0, 75.0, vec![], 20.0)).is_ok());
    }

    #[test]
    fn checked_compute_rejects_overflowing_totals() {
        let err = checked_compute(&input(1e200, 1e200, vec![], 20.0)).unwrap_err();
        let ApiError::Validation(details) = err else {
            panic!("expected a validation error");
        };
        assert!(details.contains(&"total exceeds the supported range".to_string()));
        assert!(details.contains(&"labor.total exceeds the supported range".to_string()));

        // Inputs are fine on their own; only the product overflows
        assert!(input(1e200, 1e200, vec![], 20.0).validate().is_empty());
        assert!(checked_compute(&input(1e6, 1e3, vec![material("Wire", 1e6, 1e3)], 20.0)).is_ok());
    }

    #[test]
    fn checked_rejects_recalculated_overflow() {
        let original = compute(&input(1.0, 1.0, vec![material("Wire", 1e300, 1.0)], 0.0));
        let repriced = recalculate(1.0, 1.0, original.materials.items, 1e300);

        assert!(checked(repriced).is_err());
    }

    #[test]
    fn recalculate_keeps_ids_and_fixes_totals() {
        let mut original = compute(&input(2.0, 50.0, vec![material("Switch", 2.0, 5.0)], 0.0));
        original.materials.items[0].quantity = 4.0;

        let repriced = recalculate(2.0, 50.0, original.materials.items, 10.0);
        assert_eq!(repriced.materials.items[0].id, "mat-0");
        assert!((repriced.materials.items[0].total - 20.0).abs() < EPS);
        assert!((repriced.total - 132.0).abs() < EPS);
    }
}
