//! Period calendar: month boundaries, previous periods, and month sequences.
//!
//! Every date the crate reasons about is a reporting period, normalised to
//! the first day of its month. Pure date arithmetic; foundation for the
//! reconciler's window selection.

use crate::error::{TrackError, TrackResult};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar-month anchor, always the first day of the month.
///
/// Two periods compare equal exactly when they denote the same month.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Period(NaiveDate);

/// French month names as they appear in pipeline parameters, with and
/// without diacritics.
const FRENCH_MONTHS: [(&str, u32); 15] = [
    ("janvier", 1),
    ("fevrier", 2),
    ("février", 2),
    ("mars", 3),
    ("avril", 4),
    ("mai", 5),
    ("juin", 6),
    ("juillet", 7),
    ("aout", 8),
    ("août", 8),
    ("septembre", 9),
    ("octobre", 10),
    ("novembre", 11),
    ("decembre", 12),
    ("décembre", 12),
];

impl Period {
    /// Truncate any date to its first-of-month anchor.
    pub fn month_start(date: NaiveDate) -> Period {
        // day 1 always exists for a valid (year, month)
        Period(NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap())
    }

    pub fn from_ym(year: i32, month: u32) -> TrackResult<Period> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Period)
            .ok_or_else(|| TrackError::InvalidDateFormat {
                input: format!("{year}-{month:02}"),
            })
    }

    /// Parse a period from "YYYY-MM-DD" or "YYYY-MM". Any day component is
    /// truncated to the first of the month.
    pub fn parse(input: &str) -> TrackResult<Period> {
        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            return Ok(Period::month_start(date));
        }
        if let Some((y, m)) = input.split_once('-') {
            if let (Ok(year), Ok(month)) = (y.parse::<i32>(), m.parse::<u32>()) {
                return Period::from_ym(year, month);
            }
        }
        Err(TrackError::InvalidDateFormat {
            input: input.to_string(),
        })
    }

    /// Parse a French month name ("Janvier", "Aout", "Décembre") plus year.
    pub fn from_french_month(name: &str, year: i32) -> TrackResult<Period> {
        let wanted = name.trim().to_lowercase();
        FRENCH_MONTHS
            .iter()
            .find(|(n, _)| *n == wanted)
            .map(|(_, m)| Period::from_ym(year, *m))
            .unwrap_or_else(|| {
                Err(TrackError::InvalidDateFormat {
                    input: format!("{name} {year}"),
                })
            })
    }

    /// One calendar month earlier.
    pub fn previous(&self) -> Period {
        // first-of-month minus one month is always representable
        Period(self.0.checked_sub_months(Months::new(1)).unwrap())
    }

    /// One calendar month later.
    pub fn next(&self) -> Period {
        Period(self.0.checked_add_months(Months::new(1)).unwrap())
    }

    /// All first-of-month anchors strictly after `start`, up to and
    /// including `end`, ascending. Empty if `start >= end`.
    pub fn months_between(start: Period, end: Period) -> Vec<Period> {
        let mut months = Vec::new();
        let mut cursor = start.next();
        while cursor <= end {
            months.push(cursor);
            cursor = cursor.next();
        }
        months
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next().0.pred_opt().unwrap()
    }

    pub fn days_in_month(&self) -> u32 {
        (self.next().0 - self.0).num_days() as u32
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Whether a ledger date falls inside this reporting month.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year() && date.month() == self.month()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}
