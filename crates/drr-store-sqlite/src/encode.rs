//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, periods as `YYYY_MM` tokens,
//! geography types as their upper-case names and shapes as GeoJSON.

use chrono::{DateTime, Utc};
use drr_core::{
  geography::{GeoType, Geography, GeographyId},
  geometry::Shape,
  indicator::{Indicator, IndicatorId, Unit, UnitId},
  observation::{Observation, ObservationId},
  period::DataPeriod,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── DataPeriod ──────────────────────────────────────────────────────────────

pub fn encode_period(p: DataPeriod) -> String { p.to_string() }

pub fn decode_period(s: &str) -> Result<DataPeriod> { Ok(s.parse()?) }

// ─── GeoType ─────────────────────────────────────────────────────────────────

pub fn encode_geo_type(t: GeoType) -> &'static str { t.as_str() }

pub fn decode_geo_type(s: &str) -> Result<GeoType> { Ok(s.parse()?) }

// ─── Shape ───────────────────────────────────────────────────────────────────

pub fn encode_shape(shape: &Shape) -> Result<String> {
  Ok(serde_json::to_string(shape)?)
}

pub fn decode_shape(s: &str) -> Result<Shape> { Ok(s.parse()?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `geographies` row.
pub struct RawGeography {
  pub geography_id: i64,
  pub name:         String,
  pub code:         String,
  pub geo_type:     String,
  pub parent_id:    Option<i64>,
  pub shape_json:   Option<String>,
}

impl RawGeography {
  pub fn into_geography(self) -> Result<Geography> {
    Ok(Geography {
      id:       GeographyId(self.geography_id),
      name:     self.name,
      code:     self.code,
      geo_type: decode_geo_type(&self.geo_type)?,
      parent:   self.parent_id.map(GeographyId),
      shape:    self.shape_json.as_deref().map(decode_shape).transpose()?,
    })
  }
}

/// Raw values read from an `indicators` row joined with its unit.
pub struct RawIndicator {
  pub indicator_id:       i64,
  pub name:               String,
  pub slug:               String,
  pub long_description:   Option<String>,
  pub short_description:  Option<String>,
  pub category:           Option<String>,
  // units join
  pub unit_id:            Option<i64>,
  pub unit_name:          Option<String>,
  pub unit_symbol:        Option<String>,
  pub geography_scope_id: Option<i64>,
  pub parent_id:          Option<i64>,
  pub display_order:      i32,
  pub is_visible:         bool,
  pub data_source:        Option<String>,
}

impl RawIndicator {
  pub fn into_indicator(self) -> Indicator {
    let unit = match (self.unit_id, self.unit_name) {
      (Some(id), Some(name)) => Some(Unit {
        id: UnitId(id),
        name,
        symbol: self.unit_symbol.unwrap_or_default(),
      }),
      _ => None,
    };

    Indicator {
      id: IndicatorId(self.indicator_id),
      name: self.name,
      slug: self.slug,
      long_description: self.long_description,
      short_description: self.short_description,
      category: self.category,
      unit,
      geography_scope: self.geography_scope_id.map(GeographyId),
      parent: self.parent_id.map(IndicatorId),
      display_order: self.display_order,
      is_visible: self.is_visible,
      data_source: self.data_source,
    }
  }
}

/// Raw values read directly from an `observations` row.
pub struct RawObservation {
  pub observation_id: i64,
  pub value:          Option<f64>,
  pub indicator_id:   i64,
  pub geography_id:   i64,
  pub data_period:    String,
  pub added:          String,
  pub modified:       String,
}

impl RawObservation {
  pub fn into_observation(self) -> Result<Observation> {
    Ok(Observation {
      id:          ObservationId(self.observation_id),
      value:       self.value,
      indicator:   IndicatorId(self.indicator_id),
      geography:   GeographyId(self.geography_id),
      data_period: decode_period(&self.data_period)?,
      added:       decode_dt(&self.added)?,
      modified:    decode_dt(&self.modified)?,
    })
  }
}
