//! Classification snapshot and deviation table queries.

use super::{get_period, StockStore};
use crate::{
    calendar::Period,
    classifier::{AggregationLevel, StockStateSnapshot, StockStatus},
    deviation::{DeviationRecord, StockMovements},
    error::TrackResult,
    indicator::Indicator,
    types::{ProductId, Program},
};
use rusqlite::{params, OptionalExtension};
use std::str::FromStr;

impl StockStore {
    // ── Stock state snapshots ─────────────────────────────────

    pub fn upsert_stock_state(&self, snapshot: &StockStateSnapshot) -> TrackResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO stock_state
             (product_id, period, level, sdu, rolling_avg, months_of_stock, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                snapshot.product_id,
                snapshot.period.to_string(),
                snapshot.level.as_str(),
                snapshot.sdu,
                snapshot.rolling_avg.value(),
                snapshot.months_of_stock.value(),
                snapshot.status.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn stock_states_for_period(
        &self,
        program: Program,
        period: Period,
    ) -> TrackResult<Vec<StockStateSnapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.product_id, s.period, s.level, s.sdu, s.rolling_avg,
                    s.months_of_stock, s.status
             FROM stock_state s
             INNER JOIN product p ON s.product_id = p.product_id
             WHERE p.program = ?1 AND s.period = ?2
             ORDER BY s.product_id ASC, s.level ASC",
        )?;
        let rows = stmt
            .query_map(params![program.as_str(), period.to_string()], map_snapshot)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Status counts per level for one (program, period), for end-of-run
    /// summaries.
    pub fn status_tally(
        &self,
        program: Program,
        period: Period,
    ) -> TrackResult<Vec<(String, String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.level, s.status, COUNT(*)
             FROM stock_state s
             INNER JOIN product p ON s.product_id = p.product_id
             WHERE p.program = ?1 AND s.period = ?2
             GROUP BY s.level, s.status
             ORDER BY s.level ASC, COUNT(*) DESC",
        )?;
        let rows = stmt
            .query_map(params![program.as_str(), period.to_string()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Deviations ────────────────────────────────────────────

    pub fn upsert_deviation(&self, record: &DeviationRecord) -> TrackResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO deviation
             (product_id, period, prior_theoretical, distribution, receptions,
              ppi_offtake, qc_offtake, adjustment, expected_theoretical,
              observed_theoretical, discrepancy)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.product_id,
                record.period.to_string(),
                record.prior_theoretical.value(),
                record.movements.distribution,
                record.movements.receptions,
                record.movements.ppi_offtake,
                record.movements.qc_offtake,
                record.adjustment.value(),
                record.expected_theoretical.value(),
                record.observed_theoretical.value(),
                record.discrepancy.value(),
            ],
        )?;
        Ok(())
    }

    pub fn deviation(
        &self,
        product_id: ProductId,
        period: Period,
    ) -> TrackResult<Option<DeviationRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT product_id, period, prior_theoretical, distribution, receptions,
                        ppi_offtake, qc_offtake, adjustment, expected_theoretical,
                        observed_theoretical, discrepancy
                 FROM deviation WHERE product_id = ?1 AND period = ?2",
                params![product_id, period.to_string()],
                map_deviation,
            )
            .optional()?;
        Ok(row)
    }

    /// Deviations for one (program, period), largest absolute discrepancy
    /// first; rows with no discrepancy sort last.
    pub fn largest_deviations(
        &self,
        program: Program,
        period: Period,
        limit: usize,
    ) -> TrackResult<Vec<DeviationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.product_id, d.period, d.prior_theoretical, d.distribution,
                    d.receptions, d.ppi_offtake, d.qc_offtake, d.adjustment,
                    d.expected_theoretical, d.observed_theoretical, d.discrepancy
             FROM deviation d
             INNER JOIN product p ON d.product_id = p.product_id
             WHERE p.program = ?1 AND d.period = ?2
             ORDER BY d.discrepancy IS NULL ASC, ABS(d.discrepancy) DESC
             LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(
                params![program.as_str(), period.to_string(), limit as i64],
                map_deviation,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The theoretical stock to carry into the month after `period`.
    ///
    /// Normally the expected theoretical stock rolls forward, but a
    /// December period re-anchors on the observed stock: the yearly
    /// physical inventory is authoritative and accumulated drift resets.
    pub fn prior_theoretical_stock(
        &self,
        product_id: ProductId,
        period: Period,
    ) -> TrackResult<Indicator> {
        let prior = self.deviation(product_id, period)?;
        Ok(match prior {
            None => Indicator::Undetermined,
            Some(record) if period.month() == 12 => record.observed_theoretical,
            Some(record) => record.expected_theoretical,
        })
    }
}

fn map_snapshot(row: &rusqlite::Row<'_>) -> rusqlite::Result<StockStateSnapshot> {
    let level_raw: String = row.get(2)?;
    let level = AggregationLevel::from_str(&level_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, e.into())
    })?;
    let status_raw: String = row.get(6)?;
    let status = StockStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            format!("unknown status '{status_raw}'").into(),
        )
    })?;
    Ok(StockStateSnapshot {
        product_id: row.get(0)?,
        period: get_period(row, 1)?,
        level,
        sdu: row.get(3)?,
        rolling_avg: Indicator::from(row.get::<_, Option<f64>>(4)?),
        months_of_stock: Indicator::from(row.get::<_, Option<f64>>(5)?),
        status,
    })
}

fn map_deviation(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeviationRecord> {
    Ok(DeviationRecord {
        product_id: row.get(0)?,
        period: get_period(row, 1)?,
        prior_theoretical: Indicator::from(row.get::<_, Option<f64>>(2)?),
        movements: StockMovements {
            distribution: row.get(3)?,
            receptions: row.get(4)?,
            ppi_offtake: row.get(5)?,
            qc_offtake: row.get(6)?,
        },
        adjustment: Indicator::from(row.get::<_, Option<f64>>(7)?),
        expected_theoretical: Indicator::from(row.get::<_, Option<f64>>(8)?),
        observed_theoretical: Indicator::from(row.get::<_, Option<f64>>(9)?),
        discrepancy: Indicator::from(row.get::<_, Option<f64>>(10)?),
    })
}
