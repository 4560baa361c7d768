//! Shared primitive types used across the entire crate.

use crate::error::TrackError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Database primary key of a product row.
pub type ProductId = i64;

/// External product code as carried by the source ledgers.
pub type ProductCode = i64;

/// Canonical identifier of one reporting cycle run.
pub type CycleId = String;

/// Healthcare program a product belongs to.
///
/// The set is closed: every product row in the store carries one of these,
/// and the classifier's PNLT threshold override keys off it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Program {
    /// Malaria control program.
    Pnlp,
    /// HIV control program.
    Pnls,
    /// Tuberculosis control program. Uses doubled stock thresholds.
    Pnlt,
    /// Nutrition program.
    Pnn,
    /// Mother-and-child health program.
    Pnsme,
}

impl Program {
    pub const ALL: [Program; 5] = [
        Program::Pnlp,
        Program::Pnls,
        Program::Pnlt,
        Program::Pnn,
        Program::Pnsme,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Program::Pnlp => "PNLP",
            Program::Pnls => "PNLS",
            Program::Pnlt => "PNLT",
            Program::Pnn => "PNN",
            Program::Pnsme => "PNSME",
        }
    }
}

impl FromStr for Program {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Source extracts sometimes carry a sub-program suffix ("PNLS/ARV",
        // "PNSME_GRATUITE"). Only the leading acronym identifies the program.
        let head = s
            .split(['/', '-', '_', ' '])
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();
        match head.as_str() {
            "PNLP" => Ok(Program::Pnlp),
            "PNLS" => Ok(Program::Pnls),
            "PNLT" => Ok(Program::Pnlt),
            "PNN" => Ok(Program::Pnn),
            "PNSME" => Ok(Program::Pnsme),
            _ => Err(TrackError::UnknownProgram(s.to_string())),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
