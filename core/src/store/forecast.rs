//! Forecast table queries.

use super::{get_period, StockStore};
use crate::{
    calendar::Period,
    error::TrackResult,
    forecast::ForecastRow,
    indicator::Indicator,
    types::{ProductId, Program},
};
use rusqlite::params;

impl StockStore {
    /// Replace a product's projection rows for one anchor period.
    pub fn replace_forecast(
        &self,
        product_id: ProductId,
        period: Period,
        rows: &[ForecastRow],
    ) -> TrackResult<()> {
        self.conn.execute(
            "DELETE FROM forecast WHERE product_id = ?1 AND period = ?2",
            params![product_id, period.to_string()],
        )?;
        let mut stmt = self.conn.prepare(
            "INSERT INTO forecast
             (product_id, period, projected_period, central_months, national_months)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for row in rows {
            stmt.execute(params![
                row.product_id,
                row.period.to_string(),
                row.projected_period.to_string(),
                row.central_months.value(),
                row.national_months.value(),
            ])?;
        }
        Ok(())
    }

    pub fn forecast_for_product(
        &self,
        product_id: ProductId,
        period: Period,
    ) -> TrackResult<Vec<ForecastRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT product_id, period, projected_period, central_months, national_months
             FROM forecast WHERE product_id = ?1 AND period = ?2
             ORDER BY projected_period ASC",
        )?;
        let rows = stmt
            .query_map(params![product_id, period.to_string()], |row| {
                Ok(ForecastRow {
                    product_id: row.get(0)?,
                    period: get_period(row, 1)?,
                    projected_period: get_period(row, 2)?,
                    central_months: Indicator::from(row.get::<_, Option<f64>>(3)?),
                    national_months: Indicator::from(row.get::<_, Option<f64>>(4)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn forecast_row_count(&self, program: Program, period: Period) -> TrackResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM forecast f
             INNER JOIN product p ON f.product_id = p.product_id
             WHERE p.program = ?1 AND f.period = ?2",
            params![program.as_str(), period.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
