//! Value cells: a numeric observation value together with how it is shown.

use drr_core::indicator::Indicator;
use serde::Serialize;

/// Placeholder shown wherever a value is absent.
pub const NA: &str = "NA";

/// One indicator value in a table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCell {
  pub value:   Option<f64>,
  /// `"12.5 %"`, `"3"` or [`NA`].
  pub display: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub unit:    Option<String>,
  /// The indicator's name.
  pub title:   String,
}

impl ValueCell {
  pub fn new(value: Option<f64>, indicator: &Indicator) -> Self {
    let unit = indicator.unit_label().map(str::to_owned);
    Self {
      display: render(value, unit.as_deref()),
      value,
      unit,
      title: indicator.name.clone(),
    }
  }

  /// The number before the first space of the display string.
  pub fn sort_key(&self) -> Option<f64> {
    self.display.split(' ').next()?.parse().ok()
  }
}

pub fn round2(v: f64) -> f64 { (v * 100.0).round() / 100.0 }

/// At most two decimals; whole numbers without a fraction.
pub fn format_number(v: f64) -> String { round2(v).to_string() }

pub fn render(value: Option<f64>, unit: Option<&str>) -> String {
  match (value, unit) {
    (None, _) => NA.to_owned(),
    (Some(v), Some(u)) if !u.is_empty() => format!("{} {u}", format_number(v)),
    (Some(v), _) => format_number(v),
  }
}
