//! Cycle audit events.
//!
//! Every stage of a reporting cycle appends one event to the cycle log, so
//! an operator can see afterwards what a run did and where an aborted run
//! stopped. Variants are added per stage; never removed or reordered.

use crate::{
    calendar::Period,
    reconciler::IndicatorKind,
    types::{CycleId, Program},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CycleEvent {
    CycleStarted {
        cycle_id: CycleId,
        program: Program,
        period: Period,
    },
    IndicatorReconciled {
        period: Period,
        kind: IndicatorKind,
        records: usize,
        history_rows: usize,
    },
    DeviationsComputed {
        period: Period,
        records: usize,
        flagged: usize,
    },
    StatusClassified {
        period: Period,
        snapshots: usize,
    },
    ForecastProjected {
        period: Period,
        rows: usize,
    },
    CycleCompleted {
        cycle_id: CycleId,
        period: Period,
        products: usize,
    },
}

impl CycleEvent {
    /// Stable string name for the stage column in cycle_log.
    pub fn stage_name(&self) -> &'static str {
        match self {
            CycleEvent::CycleStarted { .. } => "cycle_started",
            CycleEvent::IndicatorReconciled { .. } => "indicator_reconciled",
            CycleEvent::DeviationsComputed { .. } => "deviations_computed",
            CycleEvent::StatusClassified { .. } => "status_classified",
            CycleEvent::ForecastProjected { .. } => "forecast_projected",
            CycleEvent::CycleCompleted { .. } => "cycle_completed",
        }
    }
}

/// The cycle log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleLogEntry {
    pub id: Option<i64>,
    pub cycle_id: CycleId,
    pub program: Program,
    pub period: Period,
    pub stage: String,
    /// JSON-serialized CycleEvent.
    pub payload: String,
}
