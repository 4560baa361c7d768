//! Stock status classification.
//!
//! Buckets months-of-stock (MSD = SDU / rolling average) into discrete
//! statuses, with level-specific thresholds at three aggregation levels and
//! a finer six-bucket scheme for the manager view. Rupture and dormant
//! checks always run before any MSD band: a product with no stock is in
//! rupture no matter what its MSD would compute to.

use crate::{
    calendar::Period,
    indicator::Indicator,
    types::{Program, ProductId},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a stock figure was aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationLevel {
    /// Central warehouse; rolling average is the DMM.
    Central,
    /// Peripheral sites consolidated; rolling average is the CMM.
    Decentralized,
    /// Central + decentralized combined.
    National,
}

impl AggregationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationLevel::Central => "central",
            AggregationLevel::Decentralized => "decentralise",
            AggregationLevel::National => "national",
        }
    }

    /// Inclusive MSD band `[min, max]` that counts as well stocked.
    /// Below is under-stock, above is over-stock.
    fn msd_bounds(&self) -> (f64, f64) {
        match self {
            AggregationLevel::Central => (3.0, 8.0),
            AggregationLevel::Decentralized => (2.0, 4.0),
            AggregationLevel::National => (5.0, 12.0),
        }
    }
}

impl FromStr for AggregationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "central" => Ok(AggregationLevel::Central),
            "decentralise" => Ok(AggregationLevel::Decentralized),
            "national" => Ok(AggregationLevel::National),
            other => Err(format!("unknown aggregation level '{other}'")),
        }
    }
}

/// Stock status at an aggregation level. Labels are the French reporting
/// vocabulary carried into the deliverables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockStatus {
    Rupture,
    StockDormant,
    SousStock,
    BienStocke,
    SurStock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Rupture => "Rupture",
            StockStatus::StockDormant => "Stock dormant",
            StockStatus::SousStock => "Sous-Stock",
            StockStatus::BienStocke => "Bien Stocké",
            StockStatus::SurStock => "SurStock",
        }
    }

    pub fn parse(label: &str) -> Option<StockStatus> {
        match label {
            "Rupture" => Some(StockStatus::Rupture),
            "Stock dormant" => Some(StockStatus::StockDormant),
            "Sous-Stock" => Some(StockStatus::SousStock),
            "Bien Stocké" => Some(StockStatus::BienStocke),
            "SurStock" => Some(StockStatus::SurStock),
            _ => None,
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finer-grained manager-view status. Splits the under-stock range around
/// the urgent-order threshold (PCU).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManagerStockStatus {
    Rupture,
    StockDormant,
    EnBasDuPcu,
    EntrePcuEtMin,
    BienStocke,
    SurStock,
}

impl ManagerStockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManagerStockStatus::Rupture => "RUPTURE",
            ManagerStockStatus::StockDormant => "STOCK DORMANT",
            ManagerStockStatus::EnBasDuPcu => "EN BAS DU PCU",
            ManagerStockStatus::EntrePcuEtMin => "ENTRE PCU et MIN",
            ManagerStockStatus::BienStocke => "BIEN STOCKE",
            ManagerStockStatus::SurStock => "SURSTOCK",
        }
    }
}

impl fmt::Display for ManagerStockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted classification row. Derived fields are recomputed every
/// period, never carried forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockStateSnapshot {
    pub product_id: ProductId,
    pub period: Period,
    pub level: AggregationLevel,
    pub sdu: f64,
    pub rolling_avg: Indicator,
    pub months_of_stock: Indicator,
    pub status: StockStatus,
}

/// Months of stock on hand, guarded: a zero or undetermined rolling average
/// yields an undetermined MSD rather than a division error.
pub fn months_of_stock(sdu: f64, rolling_avg: Indicator) -> Indicator {
    match rolling_avg.value() {
        Some(avg) if avg != 0.0 => Indicator::Determined(sdu / avg),
        _ => Indicator::Undetermined,
    }
}

/// Classify a stock position at an aggregation level.
///
/// Order matters: rupture (SDU = 0) outranks everything, then dormancy
/// (stock on hand but no movement average), then the MSD bands. An
/// undetermined rolling average with stock on hand lands in the dormant
/// branch, since no consumption has ever been established.
pub fn classify(sdu: f64, rolling_avg: Indicator, level: AggregationLevel) -> StockStatus {
    if sdu == 0.0 {
        return StockStatus::Rupture;
    }
    let avg = match rolling_avg.value() {
        Some(a) if a != 0.0 => a,
        _ => return StockStatus::StockDormant,
    };
    let msd = sdu / avg;
    let (min_months, max_months) = level.msd_bounds();
    if msd < min_months {
        StockStatus::SousStock
    } else if msd > max_months {
        StockStatus::SurStock
    } else {
        StockStatus::BienStocke
    }
}

/// Manager-scheme MSD thresholds: (pcu, min, max).
/// `0 < msd <= pcu` is below the urgent-order point, `pcu < msd < min` sits
/// between PCU and minimum, `[min, max]` is well stocked, above is
/// over-stock. PNLT runs on doubled thresholds.
fn manager_thresholds(program: Program) -> (f64, f64, f64) {
    match program {
        Program::Pnlt => (1.5, 3.0, 6.0),
        _ => (1.0, 2.0, 4.0),
    }
}

/// Classify for the manager view, six buckets.
///
/// `rupture_days` is the number of stockout days the site reported over the
/// month: a site out of stock every single day is in rupture even if a
/// residual SDU was keyed in. Returns `None` when both the stock level and
/// the average are unknown, or when MSD cannot be established.
pub fn classify_manager(
    sdu: Indicator,
    manager_cmm: Indicator,
    rupture_days: Option<u32>,
    period: Period,
    program: Program,
) -> Option<ManagerStockStatus> {
    if !sdu.is_determined() && !manager_cmm.is_determined() {
        return None;
    }
    let stock = sdu.or_zero();
    if rupture_days.is_some_and(|d| d >= period.days_in_month()) || stock == 0.0 {
        return Some(ManagerStockStatus::Rupture);
    }
    let avg = match manager_cmm.value() {
        Some(a) if a == 0.0 => return Some(ManagerStockStatus::StockDormant),
        Some(a) => a,
        None => return None,
    };
    let msd = stock / avg;
    let (pcu, min_months, max_months) = manager_thresholds(program);
    if msd > 0.0 && msd <= pcu {
        Some(ManagerStockStatus::EnBasDuPcu)
    } else if msd > pcu && msd < min_months {
        Some(ManagerStockStatus::EntrePcuEtMin)
    } else if msd >= min_months && msd <= max_months {
        Some(ManagerStockStatus::BienStocke)
    } else if msd > max_months {
        Some(ManagerStockStatus::SurStock)
    } else {
        None
    }
}

/// Manager-adjusted CMM. When the site placed an order this period, the
/// order plus what is on hand approximates demand over the coverage target
/// (6 months for PNLT, 4 otherwise); otherwise the reported CMM stands.
pub fn manager_cmm(
    reported_cmm: Indicator,
    ordered_qty: Option<f64>,
    sdu: f64,
    program: Program,
) -> Indicator {
    match ordered_qty {
        Some(q) if q > 0.0 => {
            let coverage = if program == Program::Pnlt { 6.0 } else { 4.0 };
            Indicator::Determined((q + sdu) / coverage)
        }
        _ => reported_cmm,
    }
}

/// Quantity to order urgently: only when the product sits below the PCU or
/// is out of stock. Target coverage is 6 months for PNLT, 4 otherwise.
pub fn urgent_order_need(
    status: Option<ManagerStockStatus>,
    sdu: f64,
    rolling_avg: Indicator,
    program: Program,
) -> Indicator {
    let target = if program == Program::Pnlt { 6.0 } else { 4.0 };
    replenishment_need(status, sdu, rolling_avg, target)
}

/// Quantity to transfer in from peer stores, same trigger as the urgent
/// order but with a shorter coverage target (3 months for PNLT, 1 otherwise).
pub fn transfer_in_need(
    status: Option<ManagerStockStatus>,
    sdu: f64,
    rolling_avg: Indicator,
    program: Program,
) -> Indicator {
    let target = if program == Program::Pnlt { 3.0 } else { 1.0 };
    replenishment_need(status, sdu, rolling_avg, target)
}

fn replenishment_need(
    status: Option<ManagerStockStatus>,
    sdu: f64,
    rolling_avg: Indicator,
    target_months: f64,
) -> Indicator {
    let triggered = status == Some(ManagerStockStatus::EnBasDuPcu) || sdu == 0.0;
    if !triggered {
        return Indicator::Undetermined;
    }
    rolling_avg.map(|avg| target_months * avg - sdu)
}

/// Quantity available to transfer out: only for dormant or over-stocked
/// products, everything above the coverage target (6 months for PNLT,
/// 4 otherwise).
pub fn transfer_out_quantity(
    status: Option<ManagerStockStatus>,
    sdu: f64,
    rolling_avg: Indicator,
    program: Program,
) -> Indicator {
    let triggered = matches!(
        status,
        Some(ManagerStockStatus::StockDormant) | Some(ManagerStockStatus::SurStock)
    );
    if !triggered {
        return Indicator::Undetermined;
    }
    let target = if program == Program::Pnlt { 6.0 } else { 4.0 };
    rolling_avg.map(|avg| sdu - target * avg)
}
