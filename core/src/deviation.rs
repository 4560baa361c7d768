//! Theoretical stock deviation.
//!
//! Rolls the previous month's theoretical stock forward through the month's
//! movements and compares the result against the stock observed in the
//! physical inventory detail. The signed difference ("écart") is what the
//! operators must justify.

use crate::{calendar::Period, indicator::Indicator, types::ProductId};
use serde::{Deserialize, Serialize};

/// The month's stock movements for one product, already aggregated from the
/// source ledgers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StockMovements {
    /// Quantity distributed out of the warehouse.
    pub distribution: f64,
    /// Quantity received and entered into stock this month.
    pub receptions: f64,
    /// Off-take for the expanded immunisation program.
    pub ppi_offtake: f64,
    /// Off-take sampled for quality control.
    pub qc_offtake: f64,
}

/// One persisted deviation row for (product, period).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationRecord {
    pub product_id: ProductId,
    pub period: Period,
    pub prior_theoretical: Indicator,
    pub movements: StockMovements,
    /// Manual stock adjustment keyed by an operator after the fact.
    /// Never computed here.
    pub adjustment: Indicator,
    pub expected_theoretical: Indicator,
    pub observed_theoretical: Indicator,
    pub discrepancy: Indicator,
}

impl DeviationRecord {
    /// Whether the row carries a non-zero discrepancy an operator should
    /// look at.
    pub fn is_flagged(&self) -> bool {
        self.discrepancy.value().is_some_and(|d| d != 0.0)
    }
}

/// Compute the expected theoretical stock and its deviation from the
/// observed stock.
///
/// `expected = prior (0 if absent) - distribution + receptions - ppi - qc`.
/// When no observed stock exists the whole row is undetermined: without a
/// physical figure to compare against, reporting an expected value alone
/// would read as a zero deviation.
pub fn compute_deviation(
    product_id: ProductId,
    period: Period,
    prior_theoretical: Indicator,
    movements: StockMovements,
    observed_theoretical: Indicator,
) -> DeviationRecord {
    let (expected, discrepancy) = match observed_theoretical.value() {
        None => (Indicator::Undetermined, Indicator::Undetermined),
        Some(observed) => {
            let expected = prior_theoretical.or_zero() - movements.distribution
                + movements.receptions
                - movements.ppi_offtake
                - movements.qc_offtake;
            (
                Indicator::Determined(expected),
                Indicator::Determined(observed - expected),
            )
        }
    };

    DeviationRecord {
        product_id,
        period,
        prior_theoretical,
        movements,
        adjustment: Indicator::Undetermined,
        expected_theoretical: expected,
        observed_theoretical,
        discrepancy,
    }
}
