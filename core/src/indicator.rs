//! Indicator values that may be undetermined.
//!
//! RULE: "no value" and "zero" are different facts. A product with no
//! rolling window yet has an *undetermined* average; a product that moved
//! nothing has an average of 0. Every arithmetic step in the crate carries
//! this distinction instead of collapsing it into a sentinel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A computed quantity that is either a concrete number or not yet
/// determinable ("ND" in the reporting deliverables).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Indicator {
    Determined(f64),
    Undetermined,
}

impl Indicator {
    pub const ZERO: Indicator = Indicator::Determined(0.0);

    pub fn determined(value: f64) -> Self {
        Indicator::Determined(value)
    }

    pub fn is_determined(&self) -> bool {
        matches!(self, Indicator::Determined(_))
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Indicator::Determined(v) => Some(*v),
            Indicator::Undetermined => None,
        }
    }

    /// Missing values count as 0 when accumulating movement quantities.
    /// Counter logic must NOT use this; an undetermined raw value freezes
    /// the months-considered counter instead of contributing a zero month.
    pub fn or_zero(&self) -> f64 {
        self.value().unwrap_or(0.0)
    }

    /// Divide by a count, guarding the zero and undetermined cases.
    pub fn div_by(&self, count: u32) -> Indicator {
        match (self.value(), count) {
            (Some(v), n) if n > 0 => Indicator::Determined(v / n as f64),
            _ => Indicator::Undetermined,
        }
    }

    pub fn map<F: FnOnce(f64) -> f64>(self, f: F) -> Indicator {
        match self {
            Indicator::Determined(v) => Indicator::Determined(f(v)),
            Indicator::Undetermined => Indicator::Undetermined,
        }
    }

    /// Round half away from zero to `digits` decimal places, the rounding
    /// applied to every persisted indicator value.
    pub fn rounded(self, digits: u32) -> Indicator {
        let factor = 10f64.powi(digits as i32);
        self.map(|v| (v * factor).round() / factor)
    }
}

impl From<Option<f64>> for Indicator {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) => Indicator::Determined(v),
            None => Indicator::Undetermined,
        }
    }
}

impl From<Indicator> for Option<f64> {
    fn from(value: Indicator) -> Self {
        value.value()
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Indicator::Determined(v) => write!(f, "{v}"),
            Indicator::Undetermined => f.write_str("ND"),
        }
    }
}
