//! Observation aggregation: joins resolved geographies, a selected indicator
//! set and one period's observations into table rows.

use std::{
  cmp::Ordering,
  collections::{BTreeMap, HashMap},
};

use drr_core::{
  geography::{Geography, GeographyDescriptor, GeographyId},
  observation::Observation,
  period::DataPeriod,
  store::{IndicatorStore, ObservationFilter},
};
use serde::Serialize;

use crate::{
  Engine, Result,
  geo::{GeoFilter, Resolution, ResolvedGeographies},
  indicator::IndicatorSelection,
  value::{ValueCell, round2},
};

/// One table row: a geography, the region it belongs to, and a cell per
/// indicator slug.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
  #[serde(flatten)]
  pub geography:  GeographyDescriptor,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub region:     Option<GeographyDescriptor>,
  pub indicators: BTreeMap<String, ValueCell>,
}

impl TableRow {
  pub fn value(&self, slug: &str) -> Option<f64> {
    self.indicators.get(slug).and_then(|c| c.value)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
  pub period: DataPeriod,
  pub rows:   Vec<TableRow>,
}

/// Builds table rows from already-fetched observations.
///
/// Rows without a single matching observation are dropped. When the
/// selection names a slug, rows are stably sorted by that indicator,
/// highest first, rows lacking it last.
pub fn build_rows(
  resolved: &ResolvedGeographies,
  selection: &IndicatorSelection,
  observations: &[Observation],
) -> Vec<TableRow> {
  let mut by_geography: HashMap<GeographyId, Vec<&Observation>> = HashMap::new();
  for obs in observations.iter().filter(|o| selection.matches(o)) {
    by_geography.entry(obs.geography).or_default().push(obs);
  }

  let mut rows = match &resolved.resolution {
    Resolution::Typed(_) => grouped_rows(resolved, selection, &by_geography),
    Resolution::Exact => resolved
      .geographies
      .iter()
      .filter_map(|g| geography_row(resolved, selection, &by_geography, g))
      .collect(),
    Resolution::Expanded { roots } => resolved
      .geographies
      .iter()
      .filter(|g| !roots.contains(&g.id) || !has_children(resolved, g.id))
      .filter_map(|g| geography_row(resolved, selection, &by_geography, g))
      .collect(),
  };

  if let Some(slug) = &selection.slug {
    sort_descending_by(&mut rows, slug);
  }
  rows
}

fn has_children(resolved: &ResolvedGeographies, id: GeographyId) -> bool {
  resolved.geographies.iter().any(|g| g.parent == Some(id))
}

fn geography_row(
  resolved: &ResolvedGeographies,
  selection: &IndicatorSelection,
  by_geography: &HashMap<GeographyId, Vec<&Observation>>,
  geography: &Geography,
) -> Option<TableRow> {
  let observations = by_geography.get(&geography.id)?;
  let indicators = observations
    .iter()
    .filter_map(|obs| {
      let ind = selection.get(obs.indicator)?;
      Some((ind.slug.clone(), ValueCell::new(obs.value, ind)))
    })
    .collect::<BTreeMap<_, _>>();
  if indicators.is_empty() {
    return None;
  }
  Some(TableRow {
    geography: geography.descriptor(),
    region: resolved.parent_of(geography).cloned(),
    indicators,
  })
}

/// Whole-level overview: one row per parent, each cell the maximum of the
/// children's non-null values.
fn grouped_rows(
  resolved: &ResolvedGeographies,
  selection: &IndicatorSelection,
  by_geography: &HashMap<GeographyId, Vec<&Observation>>,
) -> Vec<TableRow> {
  // Keyed by parent name: parents sharing a name share a row, described by
  // the first of them.
  let mut groups: BTreeMap<String, (GeographyDescriptor, Vec<&Observation>)> = BTreeMap::new();
  for geography in &resolved.geographies {
    let Some(observations) = by_geography.get(&geography.id) else {
      continue;
    };
    let descriptor = match resolved.parent_of(geography) {
      Some(parent) => parent.clone(),
      None => geography.descriptor(),
    };
    groups
      .entry(descriptor.name.clone())
      .or_insert_with(|| (descriptor, Vec::new()))
      .1
      .extend(observations.iter().copied());
  }

  groups
    .into_values()
    .filter_map(|(descriptor, observations)| {
      let mut maxima: BTreeMap<String, (Option<f64>, &_)> = BTreeMap::new();
      for obs in observations {
        let Some(ind) = selection.get(obs.indicator) else {
          continue;
        };
        let entry = maxima.entry(ind.slug.clone()).or_insert((None, ind));
        if let Some(v) = obs.value {
          entry.0 = Some(entry.0.map_or(v, |m: f64| m.max(v)));
        }
      }
      if maxima.is_empty() {
        return None;
      }
      let indicators = maxima
        .into_iter()
        .map(|(slug, (max, ind))| (slug, ValueCell::new(max.map(round2), ind)))
        .collect();
      Some(TableRow { geography: descriptor, region: None, indicators })
    })
    .collect()
}

fn sort_descending_by(rows: &mut [TableRow], slug: &str) {
  let key = |row: &TableRow| row.indicators.get(slug).and_then(ValueCell::sort_key);
  rows.sort_by(|a, b| match (key(a), key(b)) {
    (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
    (Some(_), None) => Ordering::Less,
    (None, Some(_)) => Ordering::Greater,
    (None, None) => Ordering::Equal,
  });
}

impl<S: IndicatorStore> Engine<S> {
  /// Joins one period's observations for the resolved geographies and the
  /// selected indicators.
  pub async fn aggregate(
    &self,
    resolved: &ResolvedGeographies,
    selection: &IndicatorSelection,
    period: DataPeriod,
  ) -> Result<Vec<TableRow>> {
    self
      .bounded(async {
        let filter = ObservationFilter {
          geography_ids: Some(resolved.ids()),
          indicator_ids: Some(selection.ids()),
          data_period: Some(period),
          ..ObservationFilter::default()
        };
        let observations = self.observations(&filter).await?;
        Ok(build_rows(resolved, selection, &observations))
      })
      .await
  }

  /// Resolves the three filters of a table request and aggregates.
  pub async fn table(
    &self,
    indicator: Option<&str>,
    period: Option<DataPeriod>,
    geo: &GeoFilter,
  ) -> Result<Table> {
    self
      .bounded(async {
        let period = self.resolve_period(period).await?;
        let resolved = self.resolve_geographies(geo).await?;
        let selection = self.resolve_indicators(indicator).await?;
        let rows = self.aggregate(&resolved, &selection, period).await?;
        Ok(Table { period, rows })
      })
      .await
  }
}
