//! The `IndicatorStore` trait and supporting filter types.
//!
//! The trait is implemented by storage backends (e.g. `drr-store-sqlite`).
//! The query engine depends on this abstraction, not on any concrete backend.
//! It is read-only: ingestion writes are backend-specific.

use std::future::Future;

use crate::{
  geography::{GeoType, Geography, GeographyId},
  indicator::{Indicator, IndicatorId},
  observation::Observation,
  period::DataPeriod,
};

// ─── Filters ─────────────────────────────────────────────────────────────────
//
// All set criteria are ANDed. For `Option<Vec<_>>` fields, `None` leaves the
// column unrestricted while `Some(vec![])` matches nothing.

/// Parameters for [`IndicatorStore::find_geographies`].
#[derive(Debug, Clone, Default)]
pub struct GeographyFilter {
  pub ids:          Option<Vec<GeographyId>>,
  pub codes:        Option<Vec<String>>,
  pub geo_type:     Option<GeoType>,
  pub parent_ids:   Option<Vec<GeographyId>>,
  /// Restrict to children of geographies with these codes.
  pub parent_codes: Option<Vec<String>>,
  /// `Some(false)` selects roots only, `Some(true)` non-roots only.
  pub has_parent:   Option<bool>,
  /// Load the boundary shape. Off by default; shapes are large.
  pub with_shape:   bool,
}

impl GeographyFilter {
  pub fn by_ids(ids: impl IntoIterator<Item = GeographyId>) -> Self {
    Self { ids: Some(ids.into_iter().collect()), ..Self::default() }
  }

  pub fn by_codes<S: Into<String>>(codes: impl IntoIterator<Item = S>) -> Self {
    Self {
      codes: Some(codes.into_iter().map(Into::into).collect()),
      ..Self::default()
    }
  }

  pub fn of_type(geo_type: GeoType) -> Self {
    Self { geo_type: Some(geo_type), ..Self::default() }
  }

  pub fn children_of(parent_ids: impl IntoIterator<Item = GeographyId>) -> Self {
    Self {
      parent_ids: Some(parent_ids.into_iter().collect()),
      ..Self::default()
    }
  }

  pub fn children_of_codes<S: Into<String>>(codes: impl IntoIterator<Item = S>) -> Self {
    Self {
      parent_codes: Some(codes.into_iter().map(Into::into).collect()),
      ..Self::default()
    }
  }
}

/// Parameters for [`IndicatorStore::find_indicators`].
#[derive(Debug, Clone, Default)]
pub struct IndicatorFilter {
  pub ids:             Option<Vec<IndicatorId>>,
  pub slugs:           Option<Vec<String>>,
  pub visible_only:    bool,
  /// Restrict to direct children of indicators with these slugs.
  pub parent_slugs:    Option<Vec<String>>,
  pub has_parent:      Option<bool>,
  pub geography_scope: Option<GeographyId>,
}

impl IndicatorFilter {
  pub fn visible() -> Self {
    Self { visible_only: true, ..Self::default() }
  }

  pub fn by_slugs<S: Into<String>>(slugs: impl IntoIterator<Item = S>) -> Self {
    Self {
      slugs: Some(slugs.into_iter().map(Into::into).collect()),
      ..Self::default()
    }
  }
}

/// Parameters for [`IndicatorStore::find_observations`].
#[derive(Debug, Clone, Default)]
pub struct ObservationFilter {
  pub geography_ids:  Option<Vec<GeographyId>>,
  pub indicator_ids:  Option<Vec<IndicatorId>>,
  pub data_period:    Option<DataPeriod>,
  pub data_period_in: Option<Vec<DataPeriod>>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Read-only access to geographies, indicators and observations.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait IndicatorStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Geographies matching `filter`, ordered by name then id.
  fn find_geographies<'a>(
    &'a self,
    filter: &'a GeographyFilter,
  ) -> impl Future<Output = Result<Vec<Geography>, Self::Error>> + Send + 'a;

  /// Indicators matching `filter`, ordered by display order then id.
  fn find_indicators<'a>(
    &'a self,
    filter: &'a IndicatorFilter,
  ) -> impl Future<Output = Result<Vec<Indicator>, Self::Error>> + Send + 'a;

  /// Observations matching `filter`, ordered by id.
  fn find_observations<'a>(
    &'a self,
    filter: &'a ObservationFilter,
  ) -> impl Future<Output = Result<Vec<Observation>, Self::Error>> + Send + 'a;

  /// Every period with at least one observation, oldest first.
  fn distinct_periods(
    &self,
  ) -> impl Future<Output = Result<Vec<DataPeriod>, Self::Error>> + Send + '_;
}
