//! Product catalog synchronisation.
//!
//! The program teams hand over a catalog sheet with a status column per
//! product ("Ajout", "Suppression", "Modification"); the procurement side
//! separately delivers conversion factors and acronyms. Both flows only
//! touch descriptive attributes: product identity (code, program) is
//! immutable once created.

use crate::{
    error::TrackResult,
    store::{NewProduct, StockStore},
    types::{ProductCode, Program},
};
use serde::{Deserialize, Serialize};

/// What the catalog sheet asks for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogAction {
    #[serde(alias = "Ajout")]
    Add,
    #[serde(alias = "Suppression")]
    Remove,
    #[serde(alias = "Modification")]
    Update,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub action: CatalogAction,
    #[serde(flatten)]
    pub product: NewProduct,
}

/// A conversion-factor / acronym update from the procurement catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataUpdate {
    pub product_code: ProductCode,
    pub acronym: Option<String>,
    pub conversion_factor: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogSummary {
    pub added: usize,
    pub removed: usize,
    pub updated: usize,
}

/// Apply a status-tagged catalog snapshot to the product dimension.
pub fn apply_catalog(store: &StockStore, entries: &[CatalogEntry]) -> TrackResult<CatalogSummary> {
    let mut summary = CatalogSummary::default();
    for entry in entries {
        match entry.action {
            CatalogAction::Add => {
                store.insert_product(&entry.product)?;
                summary.added += 1;
            }
            CatalogAction::Remove => {
                summary.removed +=
                    store.delete_product(entry.product.code, entry.product.program)?;
            }
            CatalogAction::Update => {
                summary.updated += store.update_product(&entry.product)?;
            }
        }
    }
    log::info!(
        "catalog sync: {} added, {} removed, {} updated",
        summary.added,
        summary.removed,
        summary.updated
    );
    Ok(summary)
}

/// Push procurement-catalog metadata into the product dimension.
///
/// Products missing from the dimension are skipped, as are updates without
/// an acronym (an empty acronym marks an unmatched catalog row upstream).
/// Only rows whose values actually changed are written. Returns the number
/// of products updated.
pub fn sync_product_metadata(
    store: &StockStore,
    program: Program,
    updates: &[MetadataUpdate],
) -> TrackResult<usize> {
    let mut written = 0;
    for update in updates {
        if update.acronym.is_none() {
            continue;
        }
        let Some(product) = store.find_product(update.product_code, program)? else {
            continue;
        };
        let unchanged = product.acronym == update.acronym
            && product.conversion_factor == update.conversion_factor;
        if unchanged {
            continue;
        }
        store.update_product_metadata(
            product.product_id,
            update.acronym.as_deref(),
            update.conversion_factor,
        )?;
        written += 1;
    }
    if written > 0 {
        log::info!("catalog metadata: {written} product(s) updated for {program}");
    }
    Ok(written)
}
