//! Tests for the stock status classifier and its derived quantities.

use stocktrack_core::{
    calendar::Period,
    classifier::{
        classify, classify_manager, manager_cmm, months_of_stock, transfer_in_need,
        transfer_out_quantity, urgent_order_need, AggregationLevel, ManagerStockStatus,
        StockStatus,
    },
    indicator::Indicator,
    types::Program,
};

fn det(v: f64) -> Indicator {
    Indicator::Determined(v)
}

#[test]
fn rupture_outranks_every_msd_band() {
    // MSD would compute to 0, but rupture is decided on SDU alone.
    assert_eq!(
        classify(0.0, det(5.0), AggregationLevel::Central),
        StockStatus::Rupture
    );
    assert_eq!(
        classify(0.0, Indicator::Undetermined, AggregationLevel::National),
        StockStatus::Rupture
    );
}

#[test]
fn dormant_when_stock_exists_but_average_is_zero_or_unknown() {
    assert_eq!(
        classify(10.0, Indicator::ZERO, AggregationLevel::Central),
        StockStatus::StockDormant
    );
    assert_eq!(
        classify(10.0, Indicator::Undetermined, AggregationLevel::Central),
        StockStatus::StockDormant
    );
}

#[test]
fn central_band_lower_bound_is_inclusive() {
    // MSD = 24 / 8 = 3 exactly.
    assert_eq!(
        classify(24.0, det(8.0), AggregationLevel::Central),
        StockStatus::BienStocke
    );
    // Just below three months.
    assert_eq!(
        classify(23.99, det(8.0), AggregationLevel::Central),
        StockStatus::SousStock
    );
}

#[test]
fn central_band_upper_bound_is_inclusive() {
    assert_eq!(
        classify(64.0, det(8.0), AggregationLevel::Central),
        StockStatus::BienStocke
    );
    assert_eq!(
        classify(64.1, det(8.0), AggregationLevel::Central),
        StockStatus::SurStock
    );
}

#[test]
fn the_three_levels_disagree_on_the_same_position() {
    // MSD = 4.5 months.
    let sdu = 9.0;
    let avg = det(2.0);
    assert_eq!(
        classify(sdu, avg, AggregationLevel::Central),
        StockStatus::BienStocke
    );
    assert_eq!(
        classify(sdu, avg, AggregationLevel::Decentralized),
        StockStatus::SurStock
    );
    assert_eq!(
        classify(sdu, avg, AggregationLevel::National),
        StockStatus::SousStock
    );
}

#[test]
fn months_of_stock_guards_zero_and_unknown_averages() {
    assert_eq!(months_of_stock(24.0, det(8.0)), det(3.0));
    assert_eq!(months_of_stock(24.0, Indicator::ZERO), Indicator::Undetermined);
    assert_eq!(
        months_of_stock(24.0, Indicator::Undetermined),
        Indicator::Undetermined
    );
}

// ── Manager scheme ───────────────────────────────────────────────────────

fn april() -> Period {
    Period::from_ym(2026, 4).unwrap()
}

#[test]
fn pnlt_and_default_thresholds_diverge_at_one_and_a_half_months() {
    // MSD = 1.5: at or below the PNLT PCU, but between PCU and MIN for
    // everyone else.
    let status_pnlt = classify_manager(det(3.0), det(2.0), None, april(), Program::Pnlt);
    let status_default = classify_manager(det(3.0), det(2.0), None, april(), Program::Pnlp);
    assert_eq!(status_pnlt, Some(ManagerStockStatus::EnBasDuPcu));
    assert_eq!(status_default, Some(ManagerStockStatus::EntrePcuEtMin));
}

#[test]
fn pnlt_and_default_thresholds_diverge_at_five_months() {
    // MSD = 5: well stocked under the doubled PNLT bands, over-stocked
    // otherwise.
    let status_pnlt = classify_manager(det(10.0), det(2.0), None, april(), Program::Pnlt);
    let status_default = classify_manager(det(10.0), det(2.0), None, april(), Program::Pnls);
    assert_eq!(status_pnlt, Some(ManagerStockStatus::BienStocke));
    assert_eq!(status_default, Some(ManagerStockStatus::SurStock));
}

#[test]
fn pnlt_msd_of_three_is_well_stocked() {
    let status = classify_manager(det(9.0), det(3.0), None, april(), Program::Pnlt);
    assert_eq!(status, Some(ManagerStockStatus::BienStocke));
}

#[test]
fn a_full_month_of_stockout_days_is_a_rupture_despite_residual_stock() {
    // April has 30 days.
    let status = classify_manager(det(12.0), det(4.0), Some(30), april(), Program::Pnlp);
    assert_eq!(status, Some(ManagerStockStatus::Rupture));
    // 29 days out of stock is not (yet) a rupture.
    let status = classify_manager(det(12.0), det(4.0), Some(29), april(), Program::Pnlp);
    assert_eq!(status, Some(ManagerStockStatus::BienStocke));
}

#[test]
fn manager_status_is_unknown_when_both_figures_are_unknown() {
    let status = classify_manager(
        Indicator::Undetermined,
        Indicator::Undetermined,
        None,
        april(),
        Program::Pnlp,
    );
    assert_eq!(status, None);
}

#[test]
fn manager_cmm_prefers_order_based_estimate() {
    // Ordered 20, on hand 4: (20 + 4) / 4 months of default coverage.
    assert_eq!(
        manager_cmm(det(3.0), Some(20.0), 4.0, Program::Pnlp),
        det(6.0)
    );
    // PNLT covers 6 months per order cycle.
    assert_eq!(
        manager_cmm(det(3.0), Some(20.0), 4.0, Program::Pnlt),
        det(4.0)
    );
    // No order, or a zero order, keeps the reported CMM.
    assert_eq!(manager_cmm(det(3.0), None, 4.0, Program::Pnlp), det(3.0));
    assert_eq!(manager_cmm(det(3.0), Some(0.0), 4.0, Program::Pnlp), det(3.0));
}

// ── Derived quantities ───────────────────────────────────────────────────

#[test]
fn urgent_order_need_triggers_below_pcu_or_on_stockout() {
    let below_pcu = Some(ManagerStockStatus::EnBasDuPcu);
    assert_eq!(
        urgent_order_need(below_pcu, 2.0, det(3.0), Program::Pnlp),
        det(10.0) // 4 * 3 - 2
    );
    assert_eq!(
        urgent_order_need(below_pcu, 2.0, det(3.0), Program::Pnlt),
        det(16.0) // 6 * 3 - 2
    );
    // Stockout triggers even without the status.
    assert_eq!(
        urgent_order_need(Some(ManagerStockStatus::Rupture), 0.0, det(3.0), Program::Pnlp),
        det(12.0)
    );
    // A well-stocked product needs nothing.
    assert_eq!(
        urgent_order_need(Some(ManagerStockStatus::BienStocke), 9.0, det(3.0), Program::Pnlp),
        Indicator::Undetermined
    );
}

#[test]
fn transfer_in_uses_the_shorter_coverage_target() {
    let below_pcu = Some(ManagerStockStatus::EnBasDuPcu);
    assert_eq!(
        transfer_in_need(below_pcu, 2.0, det(3.0), Program::Pnlp),
        det(1.0) // 1 * 3 - 2
    );
    assert_eq!(
        transfer_in_need(below_pcu, 2.0, det(3.0), Program::Pnlt),
        det(7.0) // 3 * 3 - 2
    );
}

#[test]
fn transfer_out_applies_to_dormant_and_overstock_only() {
    assert_eq!(
        transfer_out_quantity(Some(ManagerStockStatus::SurStock), 50.0, det(4.0), Program::Pnlp),
        det(34.0) // 50 - 4 * 4
    );
    assert_eq!(
        transfer_out_quantity(
            Some(ManagerStockStatus::StockDormant),
            50.0,
            det(4.0),
            Program::Pnlt
        ),
        det(26.0) // 50 - 6 * 4
    );
    assert_eq!(
        transfer_out_quantity(Some(ManagerStockStatus::BienStocke), 50.0, det(4.0), Program::Pnlp),
        Indicator::Undetermined
    );
}
