//! Error type for `drr-store-sqlite`.

use drr_core::{geography::GeographyId, indicator::IndicatorId, period::DataPeriod};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] drr_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// An ingestion batch carried the same `(indicator, geography, period)`
  /// triple twice.
  #[error(
    "duplicate observation for indicator {} geography {} period {period}",
    indicator.0,
    geography.0
  )]
  DuplicateObservation {
    indicator: IndicatorId,
    geography: GeographyId,
    period:    DataPeriod,
  },

  /// A write succeeded but the row could not be read back.
  #[error("row vanished after write: {0}")]
  InvalidRow(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
