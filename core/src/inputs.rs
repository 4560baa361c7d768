//! Materialised input tables handed to the cycle engine.
//!
//! RULE: the engine never parses spreadsheets or talks to source systems.
//! The surrounding extraction layer materialises the month's ledgers into
//! these plain tables; everything here is lookup and per-product
//! aggregation over already-loaded rows.

use crate::{calendar::Period, indicator::Indicator, types::ProductCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One distribution ledger line: quantity shipped out for a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionLine {
    pub product_code: ProductCode,
    pub quantity: f64,
}

/// One reception ledger line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceptionLine {
    pub product_code: ProductCode,
    pub quantity: f64,
    /// When the reception was keyed into the stock system. Absent for
    /// goods received but not yet entered.
    pub entered_on: Option<NaiveDate>,
    /// When the goods physically arrived.
    pub received_on: Option<NaiveDate>,
}

/// A generic off-take line (PPI, quality control).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfftakeLine {
    pub product_code: ProductCode,
    pub quantity: f64,
}

/// One physical inventory detail line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryLine {
    pub product_code: ProductCode,
    pub physical_quantity: f64,
    pub expiry: Option<NaiveDate>,
}

/// The consolidated peripheral-level extract for one product: national
/// program stock figures in peripheral units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NationalStockLine {
    pub product_code: ProductCode,
    pub consumption: Option<f64>,
    pub sdu: Option<f64>,
    pub cmm: Option<f64>,
    /// Quantity the sites ordered this period, if any. Feeds the
    /// manager-adjusted CMM.
    pub ordered_quantity: Option<f64>,
}

/// One procurement plan line: a planned delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanLine {
    pub product_code: ProductCode,
    pub expected_period: Period,
    pub quantity: f64,
    #[serde(default)]
    pub funding_source: String,
    #[serde(default)]
    pub status: String,
}

/// Everything the engine needs for one (program, period) cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleInputs {
    pub distributions: Vec<DistributionLine>,
    pub receptions: Vec<ReceptionLine>,
    pub ppi_offtakes: Vec<OfftakeLine>,
    pub qc_offtakes: Vec<OfftakeLine>,
    pub physical_inventory: Vec<InventoryLine>,
    pub national_stock: Vec<NationalStockLine>,
    pub procurement_plan: Vec<PlanLine>,
}

impl CycleInputs {
    /// Total quantity distributed for a product. A product absent from the
    /// ledger distributed nothing.
    pub fn distribution_total(&self, code: ProductCode) -> f64 {
        self.distributions
            .iter()
            .filter(|l| l.product_code == code)
            .map(|l| l.quantity)
            .sum()
    }

    /// Receptions entered into stock within the reporting month.
    pub fn receptions_in_period(&self, code: ProductCode, period: Period) -> f64 {
        self.receptions
            .iter()
            .filter(|l| l.product_code == code)
            .filter(|l| l.entered_on.is_some_and(|d| period.contains(d)))
            .map(|l| l.quantity)
            .sum()
    }

    pub fn ppi_total(&self, code: ProductCode) -> f64 {
        self.ppi_offtakes
            .iter()
            .filter(|l| l.product_code == code)
            .map(|l| l.quantity)
            .sum()
    }

    pub fn qc_total(&self, code: ProductCode) -> f64 {
        self.qc_offtakes
            .iter()
            .filter(|l| l.product_code == code)
            .map(|l| l.quantity)
            .sum()
    }

    /// Observed theoretical stock: the sum of the physical inventory detail.
    /// Undetermined when the product has no inventory line at all, which
    /// suppresses its deviation row downstream.
    pub fn observed_stock(&self, code: ProductCode) -> Indicator {
        let mut seen = false;
        let total: f64 = self
            .physical_inventory
            .iter()
            .filter(|l| l.product_code == code)
            .inspect(|_| seen = true)
            .map(|l| l.physical_quantity)
            .sum();
        if seen {
            Indicator::Determined(total)
        } else {
            Indicator::Undetermined
        }
    }

    pub fn national_stock_for(&self, code: ProductCode) -> Option<&NationalStockLine> {
        self.national_stock.iter().find(|l| l.product_code == code)
    }

    /// Planned procurement quantity landing in a given month.
    pub fn planned_quantity(&self, code: ProductCode, period: Period) -> f64 {
        self.procurement_plan
            .iter()
            .filter(|l| l.product_code == code && l.expected_period == period)
            .map(|l| l.quantity)
            .sum()
    }
}

/// Convert a peripheral-unit quantity to central units through the product's
/// conversion factor, rounding up to whole central units.
///
/// A missing or zero factor is a recoverable data gap: the quantity
/// defaults to 0 rather than failing the batch.
pub fn to_central_units(quantity: Option<f64>, conversion_factor: Option<f64>) -> f64 {
    match (quantity, conversion_factor) {
        (Some(q), Some(f)) if f != 0.0 => (q / f).ceil(),
        _ => 0.0,
    }
}
