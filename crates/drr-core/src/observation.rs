//! Observations — the fact table: one value per indicator, geography and
//! month.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{geography::GeographyId, indicator::IndicatorId, period::DataPeriod};

/// Store-assigned handle of an [`Observation`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ObservationId(pub i64);

/// A single indicator value for one geography in one month.
///
/// At most one observation exists per `(indicator, geography, data_period)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
  pub id:          ObservationId,
  /// `None` when the source reported the cell as empty.
  pub value:       Option<f64>,
  pub indicator:   IndicatorId,
  pub geography:   GeographyId,
  pub data_period: DataPeriod,
  pub added:       DateTime<Utc>,
  pub modified:    DateTime<Utc>,
}

/// Input to an ingestion write; timestamps are set by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewObservation {
  pub value:       Option<f64>,
  pub indicator:   IndicatorId,
  pub geography:   GeographyId,
  pub data_period: DataPeriod,
}

impl NewObservation {
  pub fn new(
    indicator: IndicatorId,
    geography: GeographyId,
    data_period: DataPeriod,
    value: Option<f64>,
  ) -> Self {
    Self { value, indicator, geography, data_period }
  }

  /// The uniqueness key of the observation.
  pub fn key(&self) -> (IndicatorId, GeographyId, DataPeriod) {
    (self.indicator, self.geography, self.data_period)
  }
}
