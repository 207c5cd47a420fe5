//! Error type for `drr-query`.

use std::time::Duration;

use drr_core::period::DataPeriod;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A required singleton lookup found zero (or several) rows.
  #[error("not found: {0}")]
  NotFound(String),

  /// A filter value the resolvers cannot interpret.
  #[error("ambiguous filter: {0}")]
  AmbiguousFilter(String),

  /// An observation needed for a derived value is absent. Callers render
  /// this as `NA` rather than failing.
  #[error("no {indicator} value for {geography} in {period}")]
  DataQualityGap {
    geography: String,
    indicator: String,
    period:    DataPeriod,
  },

  #[error("query timed out after {0:?}")]
  Timeout(Duration),

  #[error("core error: {0}")]
  Core(#[source] drr_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

impl From<drr_core::Error> for Error {
  fn from(e: drr_core::Error) -> Self {
    match e {
      drr_core::Error::UnknownGeoType(_) | drr_core::Error::InvalidPeriod(_) => {
        Self::AmbiguousFilter(e.to_string())
      }
      other => Self::Core(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
