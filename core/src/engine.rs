//! The reporting cycle engine.
//!
//! STAGE ORDER (fixed, documented, never reordered):
//!   1. DMM reconciliation    (central distributions)
//!   2. CMM reconciliation    (peripheral consumptions)
//!   3. Deviation computation (theoretical vs observed stock)
//!   4. Status classification (central / decentralised / national)
//!   5. Stock projection
//!
//! RULES:
//!   - One engine run covers exactly one (program, period). Callers
//!     serialise runs per (program, period); nothing here locks.
//!   - Structural errors (duplicate product codes, ambiguous prior
//!     records) abort the run before the first write.
//!   - Re-running a cycle with the same inputs replaces the period's rows
//!     with identical values; an abandoned run is recovered by re-running.
//!   - Every stage appends one event to the cycle log.

use crate::{
    calendar::Period,
    classifier::{classify, months_of_stock, AggregationLevel, StockStateSnapshot},
    config::EngineConfig,
    deviation::{compute_deviation, StockMovements},
    error::{TrackError, TrackResult},
    event::{CycleEvent, CycleLogEntry},
    forecast::project_stock,
    indicator::Indicator,
    inputs::{to_central_units, CycleInputs},
    reconciler::{reconcile, IndicatorHistoryRecord, IndicatorKind, RollingIndicatorRecord},
    store::{ProductRow, StockStore},
    types::{CycleId, ProductId, Program},
};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub struct ReportEngine {
    pub cycle_id: CycleId,
    pub program: Program,
    pub period: Period,
    config: EngineConfig,
    store: StockStore,
}

/// What a completed cycle wrote, for the caller's end-of-run report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub cycle_id: CycleId,
    pub program: Program,
    pub period: Period,
    pub products: usize,
    pub dmm_records: usize,
    pub cmm_records: usize,
    pub deviations: usize,
    pub flagged_deviations: usize,
    pub snapshots: usize,
    pub forecast_rows: usize,
}

impl ReportEngine {
    pub fn new(program: Program, period: Period, config: EngineConfig, store: StockStore) -> Self {
        Self {
            cycle_id: Uuid::new_v4().to_string(),
            program,
            period,
            config,
            store,
        }
    }

    pub fn store(&self) -> &StockStore {
        &self.store
    }

    /// Hand the store back once the cycle is done, so the caller can run
    /// the next period against the same database.
    pub fn into_store(self) -> StockStore {
        self.store
    }

    /// Run the full reporting cycle over materialised inputs.
    pub fn run_cycle(&self, inputs: &CycleInputs) -> TrackResult<CycleSummary> {
        let products = self.store.products_for_program(self.program)?;
        self.check_unique_codes(&products)?;

        self.log_event(CycleEvent::CycleStarted {
            cycle_id: self.cycle_id.clone(),
            program: self.program,
            period: self.period,
        })?;
        log::info!(
            "cycle {} started: {} {} ({} products)",
            self.cycle_id,
            self.program,
            self.period,
            products.len()
        );

        let dmm_averages = self.reconcile_indicator(IndicatorKind::Dmm, &products, inputs)?;
        let cmm_averages = self.reconcile_indicator(IndicatorKind::Cmm, &products, inputs)?;
        let (deviations, flagged) = self.compute_deviations(&products, inputs)?;
        let snapshots = self.classify_stock(&products, &dmm_averages, inputs)?;
        let forecast_rows = self.project_forecasts(&products, &dmm_averages, inputs)?;

        self.log_event(CycleEvent::CycleCompleted {
            cycle_id: self.cycle_id.clone(),
            period: self.period,
            products: products.len(),
        })?;

        Ok(CycleSummary {
            cycle_id: self.cycle_id.clone(),
            program: self.program,
            period: self.period,
            products: products.len(),
            dmm_records: dmm_averages.len(),
            cmm_records: cmm_averages.len(),
            deviations,
            flagged_deviations: flagged,
            snapshots,
            forecast_rows,
        })
    }

    // ── Stage 1-2: rolling indicator reconciliation ───────────

    fn reconcile_indicator(
        &self,
        kind: IndicatorKind,
        products: &[ProductRow],
        inputs: &CycleInputs,
    ) -> TrackResult<HashMap<ProductId, Indicator>> {
        let prior_period = self.period.previous();
        let prior_counters = self.prior_counters(kind, prior_period, products)?;
        let mut history = self.history_by_product(kind, prior_period)?;

        let mut averages = HashMap::with_capacity(products.len());
        let mut history_rows = 0usize;

        for product in products {
            let raw = self.raw_value(kind, product, inputs);
            let prior = prior_counters.get(&product.product_id).copied().flatten();
            let product_history = history.remove(&product.product_id).unwrap_or_default();

            let outcome = reconcile(
                product.product_id,
                self.period,
                raw,
                prior,
                &product_history,
                self.config.max_months_considered,
                self.config.auto_computed,
            );

            let record = round_record(outcome.record);
            averages.insert(product.product_id, record.averaged);
            history_rows += outcome.history.len();
            self.store.upsert_indicator_record(kind, &record)?;
            self.store.replace_indicator_history(
                kind,
                product.product_id,
                self.period,
                &outcome.history,
            )?;
        }

        self.log_event(CycleEvent::IndicatorReconciled {
            period: self.period,
            kind,
            records: averages.len(),
            history_rows,
        })?;
        log::debug!(
            "{} reconciled: {} records, {} history rows",
            kind.as_str(),
            averages.len(),
            history_rows
        );
        Ok(averages)
    }

    /// The current-period raw value for one product. A product absent from
    /// the ledgers moved nothing; a missing or zero conversion factor
    /// collapses the consumption to 0 rather than failing the batch.
    fn raw_value(&self, kind: IndicatorKind, product: &ProductRow, inputs: &CycleInputs) -> Indicator {
        match kind {
            IndicatorKind::Dmm => {
                Indicator::Determined(inputs.distribution_total(product.code))
            }
            IndicatorKind::Cmm => {
                let consumption = inputs
                    .national_stock_for(product.code)
                    .and_then(|l| l.consumption)
                    .unwrap_or(0.0);
                Indicator::Determined(to_central_units(
                    Some(consumption),
                    product.conversion_factor,
                ))
            }
        }
    }

    /// Prior-period counters keyed by product. The join against the
    /// current product list must stay 1:1; an ambiguous prior record
    /// corrupts every later computation, so it aborts the cycle.
    fn prior_counters(
        &self,
        kind: IndicatorKind,
        prior_period: Period,
        products: &[ProductRow],
    ) -> TrackResult<HashMap<ProductId, Option<u32>>> {
        let records = self
            .store
            .indicator_records_for_period(kind, self.program, prior_period)?;
        let mut by_product: HashMap<ProductId, Option<u32>> = HashMap::new();
        for record in &records {
            if by_product
                .insert(record.product_id, record.months_considered)
                .is_some()
            {
                return Err(TrackError::InconsistentMerge {
                    context: "prior indicator records",
                    expected: products.len(),
                    actual: products.len() + 1,
                });
            }
        }
        Ok(by_product)
    }

    fn history_by_product(
        &self,
        kind: IndicatorKind,
        prior_period: Period,
    ) -> TrackResult<HashMap<ProductId, Vec<IndicatorHistoryRecord>>> {
        let rows = self
            .store
            .indicator_history_as_of(kind, self.program, prior_period)?;
        let mut by_product: HashMap<ProductId, Vec<IndicatorHistoryRecord>> = HashMap::new();
        for row in rows {
            by_product.entry(row.product_id).or_default().push(row);
        }
        Ok(by_product)
    }

    // ── Stage 3: deviations ───────────────────────────────────

    fn compute_deviations(
        &self,
        products: &[ProductRow],
        inputs: &CycleInputs,
    ) -> TrackResult<(usize, usize)> {
        let mut flagged = 0usize;
        for product in products {
            let movements = StockMovements {
                distribution: inputs.distribution_total(product.code),
                receptions: inputs.receptions_in_period(product.code, self.period),
                ppi_offtake: inputs.ppi_total(product.code),
                qc_offtake: inputs.qc_total(product.code),
            };
            let prior = self
                .store
                .prior_theoretical_stock(product.product_id, self.period.previous())?;
            let observed = inputs.observed_stock(product.code);
            let record = compute_deviation(
                product.product_id,
                self.period,
                prior,
                movements,
                observed,
            );
            if record.is_flagged() {
                flagged += 1;
            }
            self.store.upsert_deviation(&record)?;
        }

        self.log_event(CycleEvent::DeviationsComputed {
            period: self.period,
            records: products.len(),
            flagged,
        })?;
        Ok((products.len(), flagged))
    }

    // ── Stage 4: classification ───────────────────────────────

    fn classify_stock(
        &self,
        products: &[ProductRow],
        dmm_averages: &HashMap<ProductId, Indicator>,
        inputs: &CycleInputs,
    ) -> TrackResult<usize> {
        let mut snapshots = 0usize;
        for product in products {
            let central_sdu = inputs.observed_stock(product.code).or_zero();
            let central_avg = dmm_averages
                .get(&product.product_id)
                .copied()
                .unwrap_or(Indicator::Undetermined);

            let line = inputs.national_stock_for(product.code);
            let decentralized_sdu =
                to_central_units(line.and_then(|l| l.sdu), product.conversion_factor);
            let decentralized_avg = Indicator::Determined(to_central_units(
                line.and_then(|l| l.cmm),
                product.conversion_factor,
            ));

            let national_sdu = central_sdu + decentralized_sdu;
            let national_avg = decentralized_avg;

            for (level, sdu, avg) in [
                (AggregationLevel::Central, central_sdu, central_avg),
                (AggregationLevel::Decentralized, decentralized_sdu, decentralized_avg),
                (AggregationLevel::National, national_sdu, national_avg),
            ] {
                let snapshot = StockStateSnapshot {
                    product_id: product.product_id,
                    period: self.period,
                    level,
                    sdu,
                    rolling_avg: avg,
                    months_of_stock: months_of_stock(sdu, avg).rounded(2),
                    status: classify(sdu, avg, level),
                };
                self.store.upsert_stock_state(&snapshot)?;
                snapshots += 1;
            }
        }

        self.log_event(CycleEvent::StatusClassified {
            period: self.period,
            snapshots,
        })?;
        Ok(snapshots)
    }

    // ── Stage 5: projection ───────────────────────────────────

    fn project_forecasts(
        &self,
        products: &[ProductRow],
        dmm_averages: &HashMap<ProductId, Indicator>,
        inputs: &CycleInputs,
    ) -> TrackResult<usize> {
        let mut total_rows = 0usize;
        for product in products {
            let central_sdu = inputs.observed_stock(product.code).or_zero();
            let central_avg = dmm_averages
                .get(&product.product_id)
                .copied()
                .unwrap_or(Indicator::Undetermined);

            let line = inputs.national_stock_for(product.code);
            let decentralized_sdu =
                to_central_units(line.and_then(|l| l.sdu), product.conversion_factor);
            let national_sdu = central_sdu + decentralized_sdu;
            let national_avg = Indicator::Determined(to_central_units(
                line.and_then(|l| l.cmm),
                product.conversion_factor,
            ));

            let rows = project_stock(
                product.product_id,
                product.code,
                self.period,
                central_sdu,
                central_avg,
                national_sdu,
                national_avg,
                inputs,
                self.config.forecast_horizon_months,
            );
            total_rows += rows.len();
            self.store
                .replace_forecast(product.product_id, self.period, &rows)?;
        }

        self.log_event(CycleEvent::ForecastProjected {
            period: self.period,
            rows: total_rows,
        })?;
        Ok(total_rows)
    }

    // ── Shared helpers ────────────────────────────────────────

    /// Product codes must be unique within the program: the input ledgers
    /// are keyed by code, so a duplicate would fan every lookup out to two
    /// products and silently double-count.
    fn check_unique_codes(&self, products: &[ProductRow]) -> TrackResult<()> {
        let unique: HashSet<_> = products.iter().map(|p| p.code).collect();
        if unique.len() != products.len() {
            return Err(TrackError::InconsistentMerge {
                context: "product codes",
                expected: products.len(),
                actual: unique.len(),
            });
        }
        Ok(())
    }

    fn log_event(&self, event: CycleEvent) -> TrackResult<()> {
        let entry = CycleLogEntry {
            id: None,
            cycle_id: self.cycle_id.clone(),
            program: self.program,
            period: self.period,
            stage: event.stage_name().to_string(),
            payload: serde_json::to_string(&event)?,
        };
        self.store.append_cycle_event(&entry)
    }
}

/// Persisted indicator values are rounded to two decimals.
fn round_record(record: RollingIndicatorRecord) -> RollingIndicatorRecord {
    RollingIndicatorRecord {
        raw_value: record.raw_value.rounded(2),
        accumulated: record.accumulated.rounded(2),
        averaged: record.averaged.rounded(2),
        ..record
    }
}
