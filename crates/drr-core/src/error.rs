//! Error types for `drr-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown geography type: {0:?}")]
  UnknownGeoType(String),

  #[error("invalid data period {0:?}: expected YYYY_MM")]
  InvalidPeriod(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] geojson::Error),

  #[error("unsupported geometry: expected Polygon or MultiPolygon")]
  UnsupportedGeometry,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
