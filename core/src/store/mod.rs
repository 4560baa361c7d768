//! SQLite persistence layer.
//!
//! RULE: only the store talks to the database. The engine and the domain
//! modules call store methods; they never execute SQL directly. The core
//! computations themselves never hold a connection: they receive rows the
//! engine already read.

use crate::{
    calendar::Period,
    error::TrackResult,
    event::CycleLogEntry,
    types::{ProductCode, ProductId, Program},
};
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;

mod forecast;
mod indicators;
mod state;

pub struct StockStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for a file
}

impl StockStore {
    /// Open (or create) the tracking database at `path`.
    pub fn open(path: &str) -> TrackResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> TrackResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database. For in-memory stores
    /// this returns a fresh, isolated database.
    pub fn reopen(&self) -> TrackResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> TrackResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_products.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/002_indicators.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/003_stock_state.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/004_forecast.sql"))?;
        Ok(())
    }

    // ── Cycle log ──────────────────────────────────────────────

    pub fn append_cycle_event(&self, entry: &CycleLogEntry) -> TrackResult<()> {
        self.conn.execute(
            "INSERT INTO cycle_log (cycle_id, program, period, stage, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.cycle_id,
                entry.program.as_str(),
                entry.period.to_string(),
                entry.stage,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_cycle(&self, cycle_id: &str) -> TrackResult<Vec<CycleLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, cycle_id, program, period, stage, payload
             FROM cycle_log WHERE cycle_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![cycle_id], |row| {
                Ok(CycleLogEntry {
                    id: Some(row.get(0)?),
                    cycle_id: row.get(1)?,
                    program: get_program(row, 2)?,
                    period: get_period(row, 3)?,
                    stage: row.get(4)?,
                    payload: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Product dimension ──────────────────────────────────────

    pub fn insert_product(&self, product: &NewProduct) -> TrackResult<ProductId> {
        self.conn.execute(
            "INSERT INTO product
             (code, former_code, category, designation, product_type,
              central_unit, peripheral_unit, conversion_factor, program, acronym)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                product.code,
                product.former_code,
                product.category,
                product.designation,
                product.product_type,
                product.central_unit,
                product.peripheral_unit,
                product.conversion_factor,
                product.program.as_str(),
                product.acronym,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn products_for_program(&self, program: Program) -> TrackResult<Vec<ProductRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT product_id, code, former_code, category, designation, product_type,
                    central_unit, peripheral_unit, conversion_factor, program, acronym
             FROM product WHERE program = ?1
             ORDER BY product_id ASC",
        )?;
        let rows = stmt
            .query_map(params![program.as_str()], |row| Self::map_product_row(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn find_product(
        &self,
        code: ProductCode,
        program: Program,
    ) -> TrackResult<Option<ProductRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT product_id, code, former_code, category, designation, product_type,
                        central_unit, peripheral_unit, conversion_factor, program, acronym
                 FROM product WHERE code = ?1 AND program = ?2",
                params![code, program.as_str()],
                |row| Self::map_product_row(row),
            )
            .optional()?;
        Ok(row)
    }

    /// Update the descriptive attributes of a product. Identity
    /// (code, program) never changes.
    pub fn update_product(&self, product: &NewProduct) -> TrackResult<usize> {
        let updated = self.conn.execute(
            "UPDATE product
             SET former_code = ?1, category = ?2, designation = ?3,
                 product_type = ?4, central_unit = ?5, peripheral_unit = ?6,
                 conversion_factor = ?7
             WHERE code = ?8 AND program = ?9",
            params![
                product.former_code,
                product.category,
                product.designation,
                product.product_type,
                product.central_unit,
                product.peripheral_unit,
                product.conversion_factor,
                product.code,
                product.program.as_str(),
            ],
        )?;
        Ok(updated)
    }

    pub fn delete_product(&self, code: ProductCode, program: Program) -> TrackResult<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM product WHERE code = ?1 AND program = ?2",
            params![code, program.as_str()],
        )?;
        Ok(deleted)
    }

    /// Update the catalog-fed metadata (acronym, conversion factor) of a
    /// single product.
    pub fn update_product_metadata(
        &self,
        product_id: ProductId,
        acronym: Option<&str>,
        conversion_factor: Option<f64>,
    ) -> TrackResult<()> {
        self.conn.execute(
            "UPDATE product SET acronym = ?1, conversion_factor = ?2
             WHERE product_id = ?3",
            params![acronym, conversion_factor, product_id],
        )?;
        Ok(())
    }

    pub fn product_count(&self, program: Program) -> TrackResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM product WHERE program = ?1",
            params![program.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn map_product_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProductRow> {
        Ok(ProductRow {
            product_id: row.get(0)?,
            code: row.get(1)?,
            former_code: row.get(2)?,
            category: row.get(3)?,
            designation: row.get(4)?,
            product_type: row.get(5)?,
            central_unit: row.get(6)?,
            peripheral_unit: row.get(7)?,
            conversion_factor: row.get(8)?,
            program: get_program(row, 9)?,
            acronym: row.get(10)?,
        })
    }
}

/// A product row as persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub product_id: ProductId,
    pub code: ProductCode,
    pub former_code: Option<String>,
    pub category: String,
    pub designation: String,
    pub product_type: String,
    pub central_unit: String,
    pub peripheral_unit: String,
    pub conversion_factor: Option<f64>,
    pub program: Program,
    pub acronym: Option<String>,
}

/// A product about to be inserted or updated; everything but the generated
/// primary key.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NewProduct {
    pub code: ProductCode,
    #[serde(default)]
    pub former_code: Option<String>,
    #[serde(default)]
    pub category: String,
    pub designation: String,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub central_unit: String,
    #[serde(default)]
    pub peripheral_unit: String,
    #[serde(default)]
    pub conversion_factor: Option<f64>,
    pub program: Program,
    #[serde(default)]
    pub acronym: Option<String>,
}

// ── Column decoding helpers shared by the submodules ──────────

pub(crate) fn get_period(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Period> {
    let raw: String = row.get(idx)?;
    Period::parse(&raw).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("invalid period '{raw}'").into(),
        )
    })
}

pub(crate) fn get_program(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Program> {
    let raw: String = row.get(idx)?;
    Program::from_str(&raw).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown program '{raw}'").into(),
        )
    })
}
