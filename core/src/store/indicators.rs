//! Rolling indicator and history table queries.

use super::{get_period, StockStore};
use crate::{
    calendar::Period,
    error::TrackResult,
    indicator::Indicator,
    reconciler::{IndicatorHistoryRecord, IndicatorKind, RollingIndicatorRecord},
    types::{ProductId, Program},
};
use rusqlite::{params, OptionalExtension};

fn record_table(kind: IndicatorKind) -> &'static str {
    match kind {
        IndicatorKind::Dmm => "dmm_record",
        IndicatorKind::Cmm => "cmm_record",
    }
}

fn history_table(kind: IndicatorKind) -> &'static str {
    match kind {
        IndicatorKind::Dmm => "dmm_history",
        IndicatorKind::Cmm => "cmm_history",
    }
}

impl StockStore {
    pub fn upsert_indicator_record(
        &self,
        kind: IndicatorKind,
        record: &RollingIndicatorRecord,
    ) -> TrackResult<()> {
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {}
                 (product_id, period, raw_value, months_considered,
                  accumulated, averaged, comment)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                record_table(kind)
            ),
            params![
                record.product_id,
                record.period.to_string(),
                record.raw_value.value(),
                record.months_considered,
                record.accumulated.value(),
                record.averaged.value(),
                record.comment,
            ],
        )?;
        Ok(())
    }

    pub fn indicator_record(
        &self,
        kind: IndicatorKind,
        product_id: ProductId,
        period: Period,
    ) -> TrackResult<Option<RollingIndicatorRecord>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT product_id, period, raw_value, months_considered,
                            accumulated, averaged, comment
                     FROM {} WHERE product_id = ?1 AND period = ?2",
                    record_table(kind)
                ),
                params![product_id, period.to_string()],
                map_indicator_record,
            )
            .optional()?;
        Ok(row)
    }

    /// All indicator records of a program for one period, product order.
    pub fn indicator_records_for_period(
        &self,
        kind: IndicatorKind,
        program: Program,
        period: Period,
    ) -> TrackResult<Vec<RollingIndicatorRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT r.product_id, r.period, r.raw_value, r.months_considered,
                    r.accumulated, r.averaged, r.comment
             FROM {} r
             INNER JOIN product p ON r.product_id = p.product_id
             WHERE p.program = ?1 AND r.period = ?2
             ORDER BY r.product_id ASC",
            record_table(kind)
        ))?;
        let rows = stmt
            .query_map(params![program.as_str(), period.to_string()], map_indicator_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Replace a product's history rows for one as-of period.
    pub fn replace_indicator_history(
        &self,
        kind: IndicatorKind,
        product_id: ProductId,
        as_of: Period,
        rows: &[IndicatorHistoryRecord],
    ) -> TrackResult<()> {
        self.conn.execute(
            &format!(
                "DELETE FROM {} WHERE product_id = ?1 AND as_of_period = ?2",
                history_table(kind)
            ),
            params![product_id, as_of.to_string()],
        )?;
        let mut stmt = self.conn.prepare(&format!(
            "INSERT INTO {}
             (product_id, as_of_period, considered_period, raw_value)
             VALUES (?1, ?2, ?3, ?4)",
            history_table(kind)
        ))?;
        for row in rows {
            stmt.execute(params![
                row.product_id,
                row.as_of_period.to_string(),
                row.considered_period.to_string(),
                row.raw_value.value(),
            ])?;
        }
        Ok(())
    }

    /// Annotate a persisted indicator record. The comment is the only
    /// field an indicator record accepts a mutation on.
    pub fn update_indicator_comment(
        &self,
        kind: IndicatorKind,
        product_id: ProductId,
        period: Period,
        comment: &str,
    ) -> TrackResult<()> {
        self.conn.execute(
            &format!(
                "UPDATE {} SET comment = ?1 WHERE product_id = ?2 AND period = ?3",
                record_table(kind)
            ),
            params![comment, product_id, period.to_string()],
        )?;
        Ok(())
    }

    /// Seed one accepted history row directly. Used by the external
    /// validation workflow and by tests.
    pub fn insert_indicator_history(
        &self,
        kind: IndicatorKind,
        row: &IndicatorHistoryRecord,
    ) -> TrackResult<()> {
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {}
                 (product_id, as_of_period, considered_period, raw_value)
                 VALUES (?1, ?2, ?3, ?4)",
                history_table(kind)
            ),
            params![
                row.product_id,
                row.as_of_period.to_string(),
                row.considered_period.to_string(),
                row.raw_value.value(),
            ],
        )?;
        Ok(())
    }

    /// All history rows of a program for one as-of period, sorted by
    /// product then considered period (the reconciler's input contract).
    pub fn indicator_history_as_of(
        &self,
        kind: IndicatorKind,
        program: Program,
        as_of: Period,
    ) -> TrackResult<Vec<IndicatorHistoryRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT h.product_id, h.as_of_period, h.considered_period, h.raw_value
             FROM {} h
             INNER JOIN product p ON h.product_id = p.product_id
             WHERE p.program = ?1 AND h.as_of_period = ?2
             ORDER BY h.product_id ASC, h.considered_period ASC",
            history_table(kind)
        ))?;
        let rows = stmt
            .query_map(params![program.as_str(), as_of.to_string()], map_history_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn history_for_product(
        &self,
        kind: IndicatorKind,
        product_id: ProductId,
        as_of: Period,
    ) -> TrackResult<Vec<IndicatorHistoryRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT product_id, as_of_period, considered_period, raw_value
             FROM {} WHERE product_id = ?1 AND as_of_period = ?2
             ORDER BY considered_period ASC",
            history_table(kind)
        ))?;
        let rows = stmt
            .query_map(params![product_id, as_of.to_string()], map_history_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn map_indicator_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RollingIndicatorRecord> {
    Ok(RollingIndicatorRecord {
        product_id: row.get(0)?,
        period: get_period(row, 1)?,
        raw_value: Indicator::from(row.get::<_, Option<f64>>(2)?),
        months_considered: row.get(3)?,
        accumulated: Indicator::from(row.get::<_, Option<f64>>(4)?),
        averaged: Indicator::from(row.get::<_, Option<f64>>(5)?),
        comment: row.get(6)?,
    })
}

fn map_history_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<IndicatorHistoryRecord> {
    Ok(IndicatorHistoryRecord {
        product_id: row.get(0)?,
        as_of_period: get_period(row, 1)?,
        considered_period: get_period(row, 2)?,
        raw_value: Indicator::from(row.get::<_, Option<f64>>(3)?),
    })
}
