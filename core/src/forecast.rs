//! Forward stock projection.
//!
//! Projects months-of-stock for each product over a rolling horizon, at
//! central and national level. Implemented as a pure fold over the period
//! sequence: each month's coverage is last month's coverage minus the month
//! that just elapsed, topped up by planned procurement arrivals. An
//! undetermined value propagates forward; there is no way to re-anchor a
//! projection without a rolling average.

use crate::{calendar::Period, indicator::Indicator, inputs::CycleInputs, types::{ProductCode, ProductId}};
use serde::{Deserialize, Serialize};

/// Default projection horizon: the anchor month plus a year ahead.
pub const DEFAULT_HORIZON_MONTHS: u32 = 13;

/// One projected month for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub product_id: ProductId,
    /// The reporting period the projection was computed from.
    pub period: Period,
    /// The month this row projects.
    pub projected_period: Period,
    /// Projected coverage in months of stock, central level.
    pub central_months: Indicator,
    /// Projected coverage in months of stock, national level.
    pub national_months: Indicator,
}

/// Coverage for the anchor month itself: stock on hand over the rolling
/// average. Zero stock projects to zero months regardless of the average.
fn anchor_coverage(sdu: f64, rolling_avg: Indicator) -> Indicator {
    if sdu == 0.0 {
        return Indicator::ZERO;
    }
    match rolling_avg.value() {
        Some(avg) if avg != 0.0 => Indicator::Determined((sdu / avg).round()),
        _ => Indicator::Undetermined,
    }
}

/// One step of the fold: a month elapses (floor at zero) and any planned
/// arrival converts to months of coverage.
fn step_coverage(previous: Indicator, planned_qty: f64, rolling_avg: Indicator) -> Indicator {
    match (previous.value(), rolling_avg.value()) {
        (Some(prev), Some(avg)) if avg != 0.0 => {
            Indicator::Determined(((prev - 1.0).max(0.0) + planned_qty / avg).round())
        }
        _ => Indicator::Undetermined,
    }
}

/// Project one product over the horizon.
#[allow(clippy::too_many_arguments)]
pub fn project_stock(
    product_id: ProductId,
    product_code: ProductCode,
    period: Period,
    central_sdu: f64,
    central_avg: Indicator,
    national_sdu: f64,
    national_avg: Indicator,
    inputs: &CycleInputs,
    horizon_months: u32,
) -> Vec<ForecastRow> {
    let mut rows = Vec::with_capacity(horizon_months as usize);
    let mut central = anchor_coverage(central_sdu, central_avg);
    let mut national = anchor_coverage(national_sdu, national_avg);
    let mut projected = period;

    for offset in 0..horizon_months {
        if offset > 0 {
            projected = projected.next();
            let planned = inputs.planned_quantity(product_code, projected);
            central = step_coverage(central, planned, central_avg);
            national = step_coverage(national, planned, national_avg);
        }
        rows.push(ForecastRow {
            product_id,
            period,
            projected_period: projected,
            central_months: central,
            national_months: national,
        });
    }

    rows
}
