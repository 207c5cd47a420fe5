//! Engine configuration, deserialised from the server's `config.toml`
//! (`[engine]` table). Every field has a default.

use std::time::Duration;

use drr_core::{geography::GeoType, period::DataPeriod};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// The root-level composite score used for ranking.
  pub composite_slug:      String,
  /// Geography level used when a request names no geography.
  pub default_geo_type:    GeoType,
  /// Period used when a request names none. Falls back to the latest stored
  /// period.
  pub default_time_period: Option<DataPeriod>,
  pub query_timeout_secs:  u64,
  pub top_n:               usize,
  /// Codes of states reported at revenue-circle / sub-district level instead
  /// of district level.
  pub sub_district_states: Vec<String>,
  pub report:              ReportConfig,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      composite_slug:      "risk-score".to_owned(),
      default_geo_type:    GeoType::District,
      default_time_period: None,
      query_timeout_secs:  30,
      top_n:               5,
      sub_district_states: Vec::new(),
      report:              ReportConfig::default(),
    }
  }
}

impl EngineConfig {
  pub fn query_timeout(&self) -> Duration { Duration::from_secs(self.query_timeout_secs) }

  pub fn uses_sub_districts(&self, state_code: &str) -> bool {
    self.sub_district_states.iter().any(|c| c == state_code)
  }
}

/// Indicator slugs the state report is assembled from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
  /// Sub-factor scores shown next to the composite in "Major indicators".
  pub factor_slugs:         Vec<String>,
  /// Per-district values shown in "Highlights".
  pub highlight_slugs:      Vec<String>,
  /// Addends of the derived infrastructure-damage figure.
  pub infrastructure_slugs: Vec<String>,
  /// Totalled over the financial year and the trailing three years.
  pub cumulative_slugs:     Vec<String>,
  /// Indicators for which the worst-hit top district is called out.
  pub insight_slugs:        Vec<String>,
  /// Public spending indicator; lowest values mark the least funded areas.
  pub tender_slug:          String,
}

impl Default for ReportConfig {
  fn default() -> Self {
    let owned = |slugs: &[&str]| slugs.iter().map(|s| (*s).to_owned()).collect();
    Self {
      factor_slugs:         owned(&[
        "flood-hazard",
        "exposure",
        "vulnerability",
        "government-response",
      ]),
      highlight_slugs:      owned(&[
        "inundation-pct",
        "sum-population",
        "human-live-lost",
        "population-affected-total",
        "crop-area",
        "total-animal-affected",
        "total-tender-awarded-value",
      ]),
      infrastructure_slugs: owned(&["roads", "bridge", "embankments-affected"]),
      cumulative_slugs:     owned(&["total-tender-awarded-value", "population-affected-total"]),
      insight_slugs:        owned(&["inundation-pct", "population-affected-total"]),
      tender_slug:          "total-tender-awarded-value".to_owned(),
    }
  }
}
