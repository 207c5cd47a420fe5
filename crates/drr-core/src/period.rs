//! Data periods — the `"YYYY_MM"` tokens that key each monthly observation
//! batch.
//!
//! The token format is zero-padded, so lexicographic order of the tokens and
//! chronological order of the periods coincide. [`DataPeriod`] keeps the two
//! numeric parts and derives its ordering from them.

use std::{fmt, str::FromStr};

use chrono::{Datelike, Month, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{Error, Result};

/// First month of the April–March financial year.
pub const FISCAL_YEAR_START_MONTH: u32 = 4;

/// One calendar month of observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataPeriod {
  year:  i32,
  month: u32,
}

impl DataPeriod {
  pub fn new(year: i32, month: u32) -> Result<Self> {
    if !(1..=12).contains(&month) || !(0..=9999).contains(&year) {
      return Err(Error::InvalidPeriod(format!("{year}_{month}")));
    }
    Ok(Self { year, month })
  }

  /// The period containing `date`.
  pub fn from_date(date: NaiveDate) -> Self {
    Self { year: date.year(), month: date.month() }
  }

  pub fn year(&self) -> i32 { self.year }

  pub fn month(&self) -> u32 { self.month }

  fn index(&self) -> i64 { i64::from(self.year) * 12 + i64::from(self.month - 1) }

  fn from_index(index: i64) -> Option<Self> {
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
    Self::new(year, month).ok()
  }

  /// Shift by a signed number of months. `None` when the result leaves the
  /// four-digit year range.
  pub fn offset(&self, months: i64) -> Option<Self> {
    Self::from_index(self.index() + months)
  }

  /// The `count` months ending at (and including) `self`, oldest first.
  pub fn window_back(&self, count: u32) -> Vec<Self> {
    (0..i64::from(count))
      .rev()
      .filter_map(|back| self.offset(-back))
      .collect()
  }

  /// The financial year (April–March) this period falls in, named by the
  /// calendar year in which it starts. February 2024 belongs to 2023.
  pub fn fiscal_year(&self) -> i32 {
    if self.month < FISCAL_YEAR_START_MONTH {
      self.year - 1
    } else {
      self.year
    }
  }

  /// All twelve periods of financial year `fiscal_year`, April first.
  pub fn fiscal_year_periods(fiscal_year: i32) -> Vec<Self> {
    Self { year: fiscal_year, month: FISCAL_YEAR_START_MONTH }
      .offset(11)
      .map(|end| end.window_back(12))
      .unwrap_or_default()
  }

  /// Human-readable label, e.g. `"June 2024"`.
  pub fn label(&self) -> String {
    match u8::try_from(self.month).ok().and_then(|m| Month::try_from(m).ok()) {
      Some(month) => format!("{} {}", month.name(), self.year),
      None => self.to_string(),
    }
  }
}

impl fmt::Display for DataPeriod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:04}_{:02}", self.year, self.month)
  }
}

impl FromStr for DataPeriod {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let invalid = || Error::InvalidPeriod(s.to_owned());
    let (year, month) = s.trim().split_once('_').ok_or_else(invalid)?;
    if year.len() != 4 || month.is_empty() || month.len() > 2 {
      return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    Self::new(year, month).map_err(|_| invalid())
  }
}

impl Serialize for DataPeriod {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for DataPeriod {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(de::Error::custom)
  }
}
