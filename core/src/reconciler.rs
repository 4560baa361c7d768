//! Rolling indicator reconciliation, the heart of the crate.
//!
//! Advances one product's rolling monthly indicator (DMM at central level,
//! CMM at peripheral level) by one reporting period. The rolling window is
//! backed by two persisted tables: the per-period indicator records and the
//! history of months whose raw values were accepted into the window.
//!
//! Design:
//!   - The months-considered counter saturates at `max_months`; the window
//!     models "the last N validated months", never an unbounded history.
//!   - The earliest history month is the window anchor. Its raw value is
//!     excluded from the sum and its rows are dropped when the window
//!     advances, so the next cycle re-anchors one month later.
//!   - An undetermined raw value freezes the counter. Missing raw values
//!     still sum as 0; the two NA semantics are deliberately distinct.
//!   - The function is pure. Re-running a cycle with identical inputs
//!     yields identical outputs, which is the crate's recovery strategy.

use crate::{
    calendar::Period,
    indicator::Indicator,
    types::ProductId,
};
use serde::{Deserialize, Serialize};

/// Window saturation point: a rolling average covers at most this many
/// months.
pub const DEFAULT_MAX_MONTHS: u32 = 6;

/// Which of the two rolling indicators a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    /// Mean monthly distribution, central warehouse level.
    Dmm,
    /// Mean monthly consumption, peripheral site level.
    Cmm,
}

impl IndicatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::Dmm => "dmm",
            IndicatorKind::Cmm => "cmm",
        }
    }
}

/// One row of the rolling indicator table: a product's state for one period.
///
/// Invariant: `averaged = accumulated / months_considered` whenever the
/// counter is present and non-zero; undetermined otherwise. Immutable once
/// persisted, except for the operator comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingIndicatorRecord {
    pub product_id: ProductId,
    pub period: Period,
    /// Raw current-period movement quantity (distribution or consumption).
    pub raw_value: Indicator,
    /// How many historical months the rolling average covers, capped at
    /// `max_months`. Absent until the product first reports a raw value.
    pub months_considered: Option<u32>,
    /// Sum of the windowed raw values (plus the current one in auto mode).
    pub accumulated: Indicator,
    /// The rolling average itself.
    pub averaged: Indicator,
    pub comment: String,
}

/// One row of the indicator history table: the fact that `considered_period`'s
/// raw value is part of the window as of `as_of_period`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorHistoryRecord {
    pub product_id: ProductId,
    pub as_of_period: Period,
    pub considered_period: Period,
    pub raw_value: Indicator,
}

/// Result of advancing one product by one period.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub record: RollingIndicatorRecord,
    /// The full history as of the new period, re-keyed to it. Replaces the
    /// product's history rows for this as-of period on persistence.
    pub history: Vec<IndicatorHistoryRecord>,
}

/// Advance one product's rolling indicator to `period`.
///
/// `prior_months_considered` is the counter from the previous period's
/// record, absent for a product never reconciled before. `history` holds
/// the product's accepted history rows as of the previous period, sorted by
/// considered period.
///
/// With `auto_mode`, the current raw value is accepted into the window
/// immediately: it joins the sum and a history row for the current period is
/// appended, while the anchor month's rows are dropped so the window slides.
/// Without it, only already-validated history is summed and the history
/// passes through untouched (re-keyed to the new as-of period); acceptance
/// of the current month is deferred to an external validation step.
pub fn reconcile(
    product_id: ProductId,
    period: Period,
    current_raw: Indicator,
    prior_months_considered: Option<u32>,
    history: &[IndicatorHistoryRecord],
    max_months: u32,
    auto_mode: bool,
) -> ReconcileOutcome {
    // 1. Months-considered update. An undetermined raw value freezes the
    //    counter; a determined one starts it at 1 or advances it until the
    //    window saturates.
    let months_considered = if current_raw.is_determined() {
        match prior_months_considered {
            None => Some(1),
            Some(n) if n < max_months => Some(n + 1),
            Some(n) => Some(n),
        }
    } else {
        prior_months_considered
    };

    // 2. Anchor resolution: the earliest considered month on record.
    let anchor = history.iter().map(|h| h.considered_period).min();

    // 3-4. Window selection and accumulation. The anchor itself is excluded;
    //      the window is (anchor, period]. Missing raw values sum as 0.
    let accumulated = match anchor {
        None => Indicator::Undetermined,
        Some(anchor) => {
            let window = Period::months_between(anchor, period);
            let mut total: f64 = history
                .iter()
                .filter(|h| window.contains(&h.considered_period))
                .map(|h| h.raw_value.or_zero())
                .sum();
            if auto_mode {
                total += current_raw.or_zero();
            }
            Indicator::Determined(total)
        }
    };

    // 5. Averaging, guarded: no counter or an empty window means the
    //    average is not determined, never zero and never a division error.
    let averaged = match months_considered {
        Some(n) => accumulated.div_by(n),
        None => Indicator::Undetermined,
    };

    let record = RollingIndicatorRecord {
        product_id,
        period,
        raw_value: current_raw,
        months_considered,
        accumulated,
        averaged,
        comment: String::new(),
    };

    // 6. History extension. In auto mode the anchor month's rows fall out
    //    (their value must not be counted again next cycle) and the current
    //    month joins the window. Either way surviving rows are re-keyed to
    //    the new as-of period.
    let mut new_history: Vec<IndicatorHistoryRecord> = history
        .iter()
        .filter(|h| !auto_mode || anchor.map_or(true, |a| h.considered_period > a))
        .map(|h| IndicatorHistoryRecord {
            as_of_period: period,
            ..h.clone()
        })
        .collect();
    if auto_mode {
        new_history.push(IndicatorHistoryRecord {
            product_id,
            as_of_period: period,
            considered_period: period,
            raw_value: current_raw,
        });
    }
    new_history.sort_by_key(|h| h.considered_period);

    ReconcileOutcome {
        record,
        history: new_history,
    }
}
