//! Tests for the forward stock projection fold.

use stocktrack_core::{
    calendar::Period,
    forecast::{project_stock, DEFAULT_HORIZON_MONTHS},
    indicator::Indicator,
    inputs::{CycleInputs, PlanLine},
};

fn p(year: i32, month: u32) -> Period {
    Period::from_ym(year, month).unwrap()
}

fn det(v: f64) -> Indicator {
    Indicator::Determined(v)
}

fn no_plan() -> CycleInputs {
    CycleInputs::default()
}

#[test]
fn anchor_month_is_stock_over_average() {
    let rows = project_stock(1, 100, p(2026, 1), 100.0, det(10.0), 40.0, det(4.0), &no_plan(), 3);
    assert_eq!(rows[0].projected_period, p(2026, 1));
    assert_eq!(rows[0].central_months, det(10.0));
    assert_eq!(rows[0].national_months, det(10.0));
}

#[test]
fn coverage_decays_one_month_per_month() {
    let rows = project_stock(1, 100, p(2026, 1), 100.0, det(10.0), 0.0, det(4.0), &no_plan(), 4);
    let central: Vec<_> = rows.iter().map(|r| r.central_months).collect();
    assert_eq!(central, vec![det(10.0), det(9.0), det(8.0), det(7.0)]);
}

#[test]
fn planned_deliveries_top_coverage_up() {
    let mut inputs = CycleInputs::default();
    inputs.procurement_plan.push(PlanLine {
        product_code: 100,
        expected_period: p(2026, 3),
        quantity: 50.0,
        funding_source: String::new(),
        status: String::new(),
    });

    let rows = project_stock(1, 100, p(2026, 1), 100.0, det(10.0), 0.0, det(4.0), &inputs, 3);
    // March: (9 - 1) + 50 / 10 = 13.
    assert_eq!(rows[2].projected_period, p(2026, 3));
    assert_eq!(rows[2].central_months, det(13.0));
}

#[test]
fn exhausted_stock_floors_at_zero() {
    let rows = project_stock(1, 100, p(2026, 1), 0.0, det(10.0), 0.0, det(4.0), &no_plan(), 3);
    let central: Vec<_> = rows.iter().map(|r| r.central_months).collect();
    assert_eq!(central, vec![det(0.0), det(0.0), det(0.0)]);
}

#[test]
fn unknown_average_propagates_forward() {
    let mut inputs = CycleInputs::default();
    inputs.procurement_plan.push(PlanLine {
        product_code: 100,
        expected_period: p(2026, 2),
        quantity: 500.0,
        funding_source: String::new(),
        status: String::new(),
    });

    // Stock on hand but no established average: no month can be projected,
    // not even after a planned delivery.
    let rows = project_stock(
        1,
        100,
        p(2026, 1),
        25.0,
        Indicator::ZERO,
        5.0,
        Indicator::Undetermined,
        &inputs,
        3,
    );
    assert!(rows.iter().all(|r| r.central_months == Indicator::Undetermined));
    assert!(rows.iter().all(|r| r.national_months == Indicator::Undetermined));
}

#[test]
fn horizon_covers_the_anchor_plus_a_year() {
    let rows = project_stock(
        1,
        100,
        p(2026, 1),
        100.0,
        det(10.0),
        0.0,
        det(4.0),
        &no_plan(),
        DEFAULT_HORIZON_MONTHS,
    );
    assert_eq!(rows.len(), 13);
    assert_eq!(rows.last().unwrap().projected_period, p(2027, 1));
}
