//! Ranking and top-N selection.

use std::{cmp::Ordering, collections::HashSet, str::FromStr};

use drr_core::{
  geography::{GeoType, Geography, GeographyDescriptor, GeographyId},
  indicator::Indicator,
  period::DataPeriod,
  store::{GeographyFilter, IndicatorStore, ObservationFilter},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Engine, Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankOrder {
  #[default]
  Descending,
  Ascending,
}

impl FromStr for RankOrder {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "desc" | "descending" => Ok(Self::Descending),
      "asc" | "ascending" => Ok(Self::Ascending),
      _ => Err(Error::AmbiguousFilter(format!("unknown rank order {s:?}"))),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedGeography {
  #[serde(flatten)]
  pub geography: GeographyDescriptor,
  #[serde(skip)]
  pub id:        GeographyId,
  pub value:     f64,
}

/// Sorts scored candidates, keeps the first entry per geography and returns
/// at most `n`.
pub fn rank_values(
  mut scored: Vec<(GeographyId, f64)>,
  order: RankOrder,
  n: usize,
) -> Vec<(GeographyId, f64)> {
  if n == 0 {
    return Vec::new();
  }
  scored.sort_by(|(_, a), (_, b)| {
    let ord = a.partial_cmp(b).unwrap_or(Ordering::Equal);
    match order {
      RankOrder::Descending => ord.reverse(),
      RankOrder::Ascending => ord,
    }
  });

  let mut seen = HashSet::new();
  let mut ranked = Vec::with_capacity(n.min(scored.len()));
  for (id, value) in scored {
    if !seen.insert(id) {
      warn!(geography = id.0, value, "dropping duplicate ranking candidate");
      continue;
    }
    if ranked.len() < n {
      ranked.push((id, value));
    }
  }
  ranked
}

impl<S: IndicatorStore> Engine<S> {
  /// Ranks `candidates` by their non-null `indicator` value in `period`.
  pub async fn rank_geographies(
    &self,
    indicator: &Indicator,
    period: DataPeriod,
    candidates: &[Geography],
    order: RankOrder,
    n: usize,
  ) -> Result<Vec<RankedGeography>> {
    if candidates.is_empty() || n == 0 {
      return Ok(Vec::new());
    }
    self
      .bounded(async {
        let filter = ObservationFilter {
          geography_ids: Some(candidates.iter().map(|g| g.id).collect()),
          indicator_ids: Some(vec![indicator.id]),
          data_period: Some(period),
          ..ObservationFilter::default()
        };
        let scored = self
          .observations(&filter)
          .await?
          .into_iter()
          .filter_map(|o| o.value.map(|v| (o.geography, v)))
          .collect();

        Ok(
          rank_values(scored, order, n)
            .into_iter()
            .filter_map(|(id, value)| {
              let g = candidates.iter().find(|g| g.id == id)?;
              Some(RankedGeography { geography: g.descriptor(), id, value })
            })
            .collect(),
        )
      })
      .await
  }

  /// The `n` geographies in `scope` with the highest (or lowest) composite
  /// score. Without a scope, candidates are the top-level geographies and
  /// their children.
  pub async fn top_n_at_risk(
    &self,
    period: DataPeriod,
    scope: Option<&str>,
    n: usize,
    order: RankOrder,
  ) -> Result<Vec<RankedGeography>> {
    self
      .bounded(async {
        let composite = self.composite_indicator().await?;
        let candidates = self.scope_candidates(scope).await?;
        debug!(?scope, candidates = candidates.len(), "ranking composite score");
        self
          .rank_geographies(&composite, period, &candidates, order, n)
          .await
      })
      .await
  }

  /// The configured composite score. It must be a root indicator.
  pub async fn composite_indicator(&self) -> Result<Indicator> {
    let slug = &self.config().composite_slug;
    let indicator = self.indicator(slug).await?;
    if !indicator.is_composite() {
      return Err(Error::AmbiguousFilter(format!(
        "ranking indicator {slug:?} is not a root indicator"
      )));
    }
    Ok(indicator)
  }

  /// Ranking candidates for a state scope: its districts, or its districts'
  /// revenue circles / sub-districts for states configured that way.
  pub async fn scope_candidates(&self, scope: Option<&str>) -> Result<Vec<Geography>> {
    let Some(code) = scope else {
      let roots = self
        .geographies(&GeographyFilter {
          has_parent: Some(false),
          ..GeographyFilter::default()
        })
        .await?;
      let children = self
        .geographies(&GeographyFilter::children_of(roots.iter().map(|g| g.id)))
        .await?;
      return Ok(roots.into_iter().chain(children).collect());
    };

    let state = self.scope_geography(code).await?;
    let districts = self
      .geographies(&GeographyFilter::children_of([state.id]))
      .await?;
    if !self.config().uses_sub_districts(code) {
      return Ok(districts);
    }
    self
      .geographies(&GeographyFilter::children_of(districts.iter().map(|g| g.id)))
      .await
  }

  /// The one geography a scope code names, preferring states and union
  /// territories when the code is shared.
  pub async fn scope_geography(&self, code: &str) -> Result<Geography> {
    let mut matches = self.geographies(&GeographyFilter::by_codes([code])).await?;
    if let Some(pos) = matches
      .iter()
      .position(|g| matches!(g.geo_type, GeoType::State | GeoType::Ut))
    {
      return Ok(matches.swap_remove(pos));
    }
    match matches.len() {
      1 => Ok(matches.remove(0)),
      0 => Err(Error::NotFound(format!("geography with code {code:?}"))),
      _ => Err(Error::AmbiguousFilter(format!(
        "code {code:?} names {} geographies",
        matches.len()
      ))),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn id(n: i64) -> GeographyId { GeographyId(n) }

  #[test]
  fn ranks_descending_and_truncates() {
    let ranked = rank_values(
      vec![(id(1), 2.0), (id(2), 5.0), (id(3), 3.5)],
      RankOrder::Descending,
      2,
    );
    assert_eq!(ranked, vec![(id(2), 5.0), (id(3), 3.5)]);
  }

  #[test]
  fn ascending_only_on_request() {
    let ranked = rank_values(vec![(id(1), 2.0), (id(2), 5.0)], RankOrder::Ascending, 5);
    assert_eq!(ranked, vec![(id(1), 2.0), (id(2), 5.0)]);
  }

  #[test]
  fn duplicates_keep_first_after_sort() {
    let ranked = rank_values(
      vec![(id(1), 1.0), (id(2), 4.0), (id(1), 9.0)],
      RankOrder::Descending,
      5,
    );
    assert_eq!(ranked, vec![(id(1), 9.0), (id(2), 4.0)]);
  }

  #[test]
  fn zero_n_is_empty() {
    assert!(rank_values(vec![(id(1), 1.0)], RankOrder::Descending, 0).is_empty());
  }

  #[test]
  fn parse_order() {
    assert_eq!("ASC".parse::<RankOrder>().unwrap(), RankOrder::Ascending);
    assert_eq!("desc".parse::<RankOrder>().unwrap(), RankOrder::Descending);
    assert!("sideways".parse::<RankOrder>().is_err());
  }
}
