//! Engine configuration.
//!
//! Everything here has a sensible default; a JSON file can override it for
//! a given deployment. The threshold tables themselves are code, not
//! config: they are business rules with exhaustiveness-checked enums, not
//! tuning knobs.

use crate::{
    error::TrackResult,
    forecast::DEFAULT_HORIZON_MONTHS,
    reconciler::DEFAULT_MAX_MONTHS,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Saturation point of the months-considered counter.
    pub max_months_considered: u32,
    /// Whether the current month's raw values are accepted into the rolling
    /// window immediately, or deferred to external validation.
    pub auto_computed: bool,
    /// How many months the stock projection covers, anchor included.
    pub forecast_horizon_months: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_months_considered: DEFAULT_MAX_MONTHS,
            auto_computed: true,
            forecast_horizon_months: DEFAULT_HORIZON_MONTHS,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> TrackResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {e}", path.display()))?;
        Ok(serde_json::from_str(&raw)?)
    }
}
