//! Time-trend assembly: one indicator's values over a window of periods.

use std::{collections::BTreeMap, fmt, str::FromStr};

use drr_core::{
  geography::{Geography, GeographyDescriptor},
  period::DataPeriod,
  store::{GeographyFilter, IndicatorStore, ObservationFilter},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Engine, Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendWindow {
  #[serde(rename = "3M")]
  ThreeMonths,
  #[default]
  #[serde(rename = "12M")]
  TwelveMonths,
  #[serde(rename = "ALL")]
  All,
}

impl TrendWindow {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::ThreeMonths => "3M",
      Self::TwelveMonths => "12M",
      Self::All => "ALL",
    }
  }

  /// Number of calendar months covered, `None` for [`TrendWindow::All`].
  pub fn months(&self) -> Option<u32> {
    match self {
      Self::ThreeMonths => Some(3),
      Self::TwelveMonths => Some(12),
      Self::All => None,
    }
  }
}

impl fmt::Display for TrendWindow {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for TrendWindow {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_uppercase().as_str() {
      "3M" => Ok(Self::ThreeMonths),
      "12M" => Ok(Self::TwelveMonths),
      "ALL" => Ok(Self::All),
      _ => Err(Error::AmbiguousFilter(format!("unknown trend window {s:?}"))),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
  pub geography: GeographyDescriptor,
  pub value:     Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeTrend {
  pub indicator: String,
  pub window:    TrendWindow,
  /// Every period of the window, oldest first, each with the geographies
  /// observed in it ordered by name.
  pub periods:   BTreeMap<DataPeriod, Vec<TrendPoint>>,
}

impl<S: IndicatorStore> Engine<S> {
  /// Values of `slug` for the geographies under `code` over `window`,
  /// counted back from `anchor`.
  pub async fn time_trend(
    &self,
    slug: &str,
    code: Option<&str>,
    anchor: DataPeriod,
    window: TrendWindow,
  ) -> Result<TimeTrend> {
    self
      .bounded(async {
        let indicator = self.indicator(slug).await?;
        let window_periods = match window.months() {
          Some(n) => anchor.window_back(n),
          None => self.store().distinct_periods().await.map_err(Error::store)?,
        };
        let geographies = self.trend_geographies(code).await?;

        let mut periods: BTreeMap<DataPeriod, Vec<TrendPoint>> = window_periods
          .iter()
          .map(|p| (*p, Vec::new()))
          .collect();
        let observations = self
          .observations(&ObservationFilter {
            geography_ids: Some(geographies.iter().map(|g| g.id).collect()),
            indicator_ids: Some(vec![indicator.id]),
            data_period_in: Some(window_periods),
            ..ObservationFilter::default()
          })
          .await?;
        for obs in observations {
          let Some(geography) = geographies.iter().find(|g| g.id == obs.geography) else {
            continue;
          };
          if let Some(points) = periods.get_mut(&obs.data_period) {
            points.push(TrendPoint { geography: geography.descriptor(), value: obs.value });
          }
        }
        for points in periods.values_mut() {
          points.sort_by(|a, b| a.geography.name.cmp(&b.geography.name));
        }
        debug!(slug, %window, periods = periods.len(), "assembled time trend");

        Ok(TimeTrend { indicator: indicator.slug, window, periods })
      })
      .await
  }

  /// The geographies with `code`, their children and their grandchildren;
  /// without a code, the configured default level.
  async fn trend_geographies(&self, code: Option<&str>) -> Result<Vec<Geography>> {
    let Some(code) = code else {
      return self
        .geographies(&GeographyFilter::of_type(self.config().default_geo_type))
        .await;
    };
    let mut geographies = self.geographies(&GeographyFilter::by_codes([code])).await?;
    let children = self
      .geographies(&GeographyFilter::children_of_codes([code]))
      .await?;
    let grandchildren = self
      .geographies(&GeographyFilter::children_of(children.iter().map(|g| g.id)))
      .await?;
    for g in children.into_iter().chain(grandchildren) {
      if !geographies.iter().any(|known| known.id == g.id) {
        geographies.push(g);
      }
    }
    Ok(geographies)
  }
}
