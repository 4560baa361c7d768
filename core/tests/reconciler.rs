//! Tests for the rolling indicator reconciler.
//!
//! These pin down the window semantics exactly: the months-considered
//! counter, the anchor month exclusion, the auto-mode window slide, and the
//! two distinct NA behaviours (frozen counter vs zero-summed raw values).

use stocktrack_core::{
    calendar::Period,
    indicator::Indicator,
    reconciler::{reconcile, IndicatorHistoryRecord, DEFAULT_MAX_MONTHS},
};

fn p(year: i32, month: u32) -> Period {
    Period::from_ym(year, month).unwrap()
}

fn hist(product: i64, as_of: Period, considered: Period, value: f64) -> IndicatorHistoryRecord {
    IndicatorHistoryRecord {
        product_id: product,
        as_of_period: as_of,
        considered_period: considered,
        raw_value: Indicator::Determined(value),
    }
}

/// Five validated months M1..M5 anchored at M1, reconciling M6: the sum is
/// exactly M2..M5 plus the current raw value, over the counter.
#[test]
fn window_sums_post_anchor_history_plus_current() {
    let as_of = p(2026, 5);
    let history: Vec<_> = [(1, 10.0), (2, 20.0), (3, 30.0), (4, 40.0), (5, 50.0)]
        .into_iter()
        .map(|(m, v)| hist(1, as_of, p(2026, m), v))
        .collect();

    let outcome = reconcile(
        1,
        p(2026, 6),
        Indicator::Determined(60.0),
        Some(5),
        &history,
        DEFAULT_MAX_MONTHS,
        true,
    );

    assert_eq!(outcome.record.months_considered, Some(6));
    // 20 + 30 + 40 + 50 + 60: the anchor month (10) stays out.
    assert_eq!(outcome.record.accumulated, Indicator::Determined(200.0));
    assert_eq!(outcome.record.averaged, Indicator::Determined(200.0 / 6.0));
}

#[test]
fn reconcile_is_idempotent() {
    let as_of = p(2026, 3);
    let history = vec![
        hist(7, as_of, p(2026, 2), 12.0),
        hist(7, as_of, p(2026, 3), 18.0),
    ];
    let run = || {
        reconcile(
            7,
            p(2026, 4),
            Indicator::Determined(24.0),
            Some(2),
            &history,
            DEFAULT_MAX_MONTHS,
            true,
        )
    };
    assert_eq!(run(), run());
}

#[test]
fn counter_saturates_at_max_months() {
    let as_of = p(2026, 6);
    let history: Vec<_> = (1..=6).map(|m| hist(1, as_of, p(2026, m), 10.0)).collect();

    let outcome = reconcile(
        1,
        p(2026, 7),
        Indicator::Determined(10.0),
        Some(6),
        &history,
        DEFAULT_MAX_MONTHS,
        true,
    );

    assert_eq!(outcome.record.months_considered, Some(6), "never 7");
}

#[test]
fn new_product_starts_counting_at_one() {
    let outcome = reconcile(
        1,
        p(2026, 1),
        Indicator::Determined(42.0),
        None,
        &[],
        DEFAULT_MAX_MONTHS,
        true,
    );

    assert_eq!(outcome.record.months_considered, Some(1));
    // No rolling window yet: the average is undetermined, not 42.
    assert_eq!(outcome.record.averaged, Indicator::Undetermined);
    // But the window is seeded for the next cycle.
    assert_eq!(outcome.history.len(), 1);
    assert_eq!(outcome.history[0].considered_period, p(2026, 1));
}

#[test]
fn undetermined_raw_without_prior_yields_undetermined_everything() {
    let outcome = reconcile(
        1,
        p(2026, 1),
        Indicator::Undetermined,
        None,
        &[],
        DEFAULT_MAX_MONTHS,
        true,
    );

    assert_eq!(outcome.record.months_considered, None);
    assert_eq!(outcome.record.averaged, Indicator::Undetermined);
    assert_ne!(outcome.record.averaged, Indicator::ZERO);
}

#[test]
fn undetermined_raw_freezes_an_existing_counter() {
    let as_of = p(2026, 3);
    let history = vec![hist(1, as_of, p(2026, 3), 15.0)];
    let outcome = reconcile(
        1,
        p(2026, 4),
        Indicator::Undetermined,
        Some(3),
        &history,
        DEFAULT_MAX_MONTHS,
        true,
    );

    assert_eq!(outcome.record.months_considered, Some(3));
}

#[test]
fn auto_mode_slides_the_window_forward() {
    let as_of = p(2026, 5);
    let history: Vec<_> = (1..=5).map(|m| hist(1, as_of, p(2026, m), 10.0)).collect();

    let outcome = reconcile(
        1,
        p(2026, 6),
        Indicator::Determined(60.0),
        Some(5),
        &history,
        DEFAULT_MAX_MONTHS,
        true,
    );

    let considered: Vec<_> = outcome
        .history
        .iter()
        .map(|h| h.considered_period)
        .collect();
    assert_eq!(
        considered,
        vec![p(2026, 2), p(2026, 3), p(2026, 4), p(2026, 5), p(2026, 6)],
        "anchor dropped, current month appended"
    );
    assert!(outcome.history.iter().all(|h| h.as_of_period == p(2026, 6)));
    let current = outcome.history.last().unwrap();
    assert_eq!(current.raw_value, Indicator::Determined(60.0));
}

#[test]
fn manual_mode_sums_only_validated_history() {
    let as_of = p(2026, 5);
    let history: Vec<_> = [(1, 10.0), (2, 20.0), (3, 30.0), (4, 40.0), (5, 50.0)]
        .into_iter()
        .map(|(m, v)| hist(1, as_of, p(2026, m), v))
        .collect();

    let outcome = reconcile(
        1,
        p(2026, 6),
        Indicator::Determined(60.0),
        Some(5),
        &history,
        DEFAULT_MAX_MONTHS,
        false,
    );

    // Current raw value deferred to external validation.
    assert_eq!(outcome.record.accumulated, Indicator::Determined(140.0));
    // History passes through: same considered months, nothing appended.
    let considered: Vec<_> = outcome
        .history
        .iter()
        .map(|h| h.considered_period)
        .collect();
    assert_eq!(
        considered,
        vec![p(2026, 1), p(2026, 2), p(2026, 3), p(2026, 4), p(2026, 5)]
    );
}

#[test]
fn missing_history_values_accumulate_as_zero() {
    let as_of = p(2026, 3);
    let mut history = vec![
        hist(1, as_of, p(2026, 1), 10.0),
        hist(1, as_of, p(2026, 2), 20.0),
        hist(1, as_of, p(2026, 3), 30.0),
    ];
    history[1].raw_value = Indicator::Undetermined;

    let outcome = reconcile(
        1,
        p(2026, 4),
        Indicator::Determined(40.0),
        Some(3),
        &history,
        DEFAULT_MAX_MONTHS,
        true,
    );

    // 0 (undetermined M2) + 30 + 40; the counter still advanced.
    assert_eq!(outcome.record.months_considered, Some(4));
    assert_eq!(outcome.record.accumulated, Indicator::Determined(70.0));
}

#[test]
fn zero_counter_never_divides() {
    let outcome = reconcile(
        1,
        p(2026, 2),
        Indicator::Determined(10.0),
        Some(0),
        &[hist(1, p(2026, 1), p(2026, 1), 5.0)],
        DEFAULT_MAX_MONTHS,
        true,
    );

    // A zero counter is degenerate but must not divide; counter advances
    // to 1 and the average is the windowed sum over one month.
    assert_eq!(outcome.record.months_considered, Some(1));
    assert_eq!(outcome.record.averaged, Indicator::Determined(10.0));
}
