//! Derived cost views

use crate::models::{CostPoint, ProjectedCost};

/// Currency reported for every projection
pub const DEFAULT_CURRENCY: &str = "USD";
/// Provenance tag for the arithmetic-mean extrapolation
pub const AVG_DAILY_PROVENANCE: &str = "kubecost-avg-daily";
/// Days in a projected month
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Extrapolate a monthly cost from observed points
///
/// This is a plain mean of `total_cost` over the points, times 30. It does
/// not weight by period length or discard outliers, so treat the result as
/// an approximation. An empty history yields a zero projection that only
/// carries the currency.
pub fn project(points: &[CostPoint]) -> ProjectedCost {
    if points.is_empty() {
        return ProjectedCost {
            currency: DEFAULT_CURRENCY.to_string(),
            ..Default::default()
        };
    }

    let sum: f64 = points.iter().map(|p| p.total_cost).sum();
    let daily = sum / points.len() as f64;

    ProjectedCost {
        unit_price: daily,
        currency: DEFAULT_CURRENCY.to_string(),
        cost_per_month: daily * DAYS_PER_MONTH,
        billing_detail: AVG_DAILY_PROVENANCE.to_string(),
    }
}
