//! The [`Engine`] handle shared by every query operation.

use std::{collections::HashMap, future::Future, sync::Arc};

use drr_core::{
  geography::{Geography, GeographyId},
  indicator::Indicator,
  observation::Observation,
  period::DataPeriod,
  store::{GeographyFilter, IndicatorFilter, IndicatorStore, ObservationFilter},
};

use crate::{EngineConfig, Error, Result};

/// Query engine over an [`IndicatorStore`].
///
/// Holds no mutable state; clone the surrounding `Arc` to share it between
/// request handlers.
pub struct Engine<S> {
  store:  Arc<S>,
  config: EngineConfig,
}

impl<S: IndicatorStore> Engine<S> {
  pub fn new(store: Arc<S>, config: EngineConfig) -> Self { Self { store, config } }

  pub fn config(&self) -> &EngineConfig { &self.config }

  pub fn store(&self) -> &S { &self.store }

  /// Runs `fut` under the configured query timeout. An elapsed timeout
  /// drops the future and yields [`Error::Timeout`].
  pub(crate) async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
    let limit = self.config.query_timeout();
    tokio::time::timeout(limit, fut)
      .await
      .map_err(|_| Error::Timeout(limit))?
  }

  // ─── Store access ──────────────────────────────────────────────────────────

  pub(crate) async fn geographies(&self, filter: &GeographyFilter) -> Result<Vec<Geography>> {
    self
      .store
      .find_geographies(filter)
      .await
      .map_err(Error::store)
  }

  pub(crate) async fn indicators(&self, filter: &IndicatorFilter) -> Result<Vec<Indicator>> {
    self
      .store
      .find_indicators(filter)
      .await
      .map_err(Error::store)
  }

  pub(crate) async fn observations(
    &self,
    filter: &ObservationFilter,
  ) -> Result<Vec<Observation>> {
    self
      .store
      .find_observations(filter)
      .await
      .map_err(Error::store)
  }

  /// Every stored period, oldest first.
  pub async fn periods(&self) -> Result<Vec<DataPeriod>> {
    self
      .bounded(async { self.store.distinct_periods().await.map_err(Error::store) })
      .await
  }

  /// The explicit period if given, else the configured default, else the
  /// latest stored period.
  pub async fn resolve_period(&self, period: Option<DataPeriod>) -> Result<DataPeriod> {
    if let Some(p) = period.or(self.config.default_time_period) {
      return Ok(p);
    }
    self
      .periods()
      .await?
      .pop()
      .ok_or_else(|| Error::NotFound("no observation periods are stored".to_owned()))
  }

  /// Geographies with the given ids, keyed by id.
  pub(crate) async fn geographies_by_id(
    &self,
    mut ids: Vec<GeographyId>,
  ) -> Result<HashMap<GeographyId, Geography>> {
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
      return Ok(HashMap::new());
    }
    Ok(
      self
        .geographies(&GeographyFilter::by_ids(ids))
        .await?
        .into_iter()
        .map(|g| (g.id, g))
        .collect(),
    )
  }
}
