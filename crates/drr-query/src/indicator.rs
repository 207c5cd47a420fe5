//! Indicator hierarchy resolution.

use std::collections::HashMap;

use drr_core::{
  indicator::{Indicator, IndicatorId},
  observation::Observation,
  store::{IndicatorFilter, IndicatorStore},
};
use tracing::debug;

use crate::{Engine, Error, Result};

/// The set of indicators a request covers, usable as a predicate over
/// observations.
#[derive(Debug, Clone)]
pub struct IndicatorSelection {
  /// The requested slug, if any. Rows are sorted by this indicator.
  pub slug:       Option<String>,
  /// Ordered by display order then id.
  pub indicators: Vec<Indicator>,
  by_id:          HashMap<IndicatorId, usize>,
}

impl IndicatorSelection {
  pub fn new(slug: Option<String>, indicators: Vec<Indicator>) -> Self {
    let by_id = indicators
      .iter()
      .enumerate()
      .map(|(i, ind)| (ind.id, i))
      .collect();
    Self { slug, indicators, by_id }
  }

  pub fn matches(&self, observation: &Observation) -> bool {
    self.by_id.contains_key(&observation.indicator)
  }

  pub fn ids(&self) -> Vec<IndicatorId> { self.indicators.iter().map(|i| i.id).collect() }

  pub fn get(&self, id: IndicatorId) -> Option<&Indicator> {
    self.by_id.get(&id).map(|&i| &self.indicators[i])
  }

  pub fn is_empty(&self) -> bool { self.indicators.is_empty() }
}

impl<S: IndicatorStore> Engine<S> {
  /// With a slug: the visible indicator with that slug and its visible direct
  /// children (never grandchildren). Without: every visible indicator that
  /// is a root or a child of a root.
  pub async fn resolve_indicators(&self, slug: Option<&str>) -> Result<IndicatorSelection> {
    self
      .bounded(async {
        let indicators = match slug {
          Some(slug) => self.indicator_with_children(slug).await?,
          None => self.shallow_indicators().await?,
        };
        debug!(?slug, matched = indicators.len(), "resolved indicators");
        Ok(IndicatorSelection::new(slug.map(str::to_owned), indicators))
      })
      .await
  }

  /// The single visible indicator with `slug`.
  pub async fn indicator(&self, slug: &str) -> Result<Indicator> {
    let filter = IndicatorFilter {
      visible_only: true,
      ..IndicatorFilter::by_slugs([slug])
    };
    self
      .indicators(&filter)
      .await?
      .into_iter()
      .next()
      .ok_or_else(|| Error::NotFound(format!("indicator {slug:?}")))
  }

  async fn indicator_with_children(&self, slug: &str) -> Result<Vec<Indicator>> {
    let own = IndicatorFilter {
      visible_only: true,
      ..IndicatorFilter::by_slugs([slug])
    };
    let mut indicators = self.indicators(&own).await?;
    if indicators.is_empty() {
      return Err(Error::NotFound(format!("indicator {slug:?}")));
    }

    let children = IndicatorFilter {
      visible_only: true,
      parent_slugs: Some(vec![slug.to_owned()]),
      ..IndicatorFilter::default()
    };
    indicators.extend(self.indicators(&children).await?);
    indicators.sort_by_key(|i| (i.display_order, i.id));
    indicators.dedup_by_key(|i| i.id);
    Ok(indicators)
  }

  async fn shallow_indicators(&self) -> Result<Vec<Indicator>> {
    // Depth is judged against the full catalog: a hidden parent still counts.
    let all = self.indicators(&IndicatorFilter::default()).await?;
    let parent_of: HashMap<IndicatorId, Option<IndicatorId>> =
      all.iter().map(|i| (i.id, i.parent)).collect();

    Ok(
      all
        .into_iter()
        .filter(|i| i.is_visible)
        .filter(|i| match i.parent {
          None => true,
          Some(p) => parent_of.get(&p).copied().flatten().is_none(),
        })
        .collect(),
    )
  }
}
