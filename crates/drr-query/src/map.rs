//! GeoJSON projection of one indicator over one geography level.

use std::collections::{BTreeMap, HashMap};

use drr_core::{
  geography::{GeoType, Geography, GeographyId},
  geometry::{BoundingBox, Shape},
  period::DataPeriod,
  store::{GeographyFilter, IndicatorStore, ObservationFilter},
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{Engine, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
  pub features: Vec<MapFeature>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct MapFeature {
  pub geometry:   Option<Shape>,
  pub properties: FeatureProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureProperties {
  pub name:   String,
  pub code:   String,
  /// `<slug>: value` and `<parent-type>-code: code` on matched features.
  #[serde(flatten)]
  pub extra:  BTreeMap<String, Value>,
  /// `[[min_y, max_y], [min_x, max_x]]`; matched districts only.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub bounds: Option<BoundingBox>,
}

/// Builds one feature per geography. `values` holds the observed value of
/// each geography that has an observation; `parents` their parent rows.
pub fn project_features(
  geographies: Vec<Geography>,
  slug: &str,
  values: &HashMap<GeographyId, Option<f64>>,
  parents: &HashMap<GeographyId, Geography>,
) -> Vec<MapFeature> {
  geographies
    .into_iter()
    .map(|g| {
      let mut properties = FeatureProperties {
        name:   g.name,
        code:   g.code,
        extra:  BTreeMap::new(),
        bounds: None,
      };
      if let Some(value) = values.get(&g.id) {
        properties.extra.insert(slug.to_owned(), value.map_or(Value::Null, Value::from));
        if let Some(parent) = g.parent.and_then(|p| parents.get(&p)) {
          properties
            .extra
            .insert(parent.geo_type.code_key(), Value::from(parent.code.clone()));
        }
        if g.geo_type == GeoType::District {
          properties.bounds = g.shape.as_ref().and_then(Shape::bounding_box);
        }
      }
      MapFeature { geometry: g.shape, properties }
    })
    .collect()
}

impl<S: IndicatorStore> Engine<S> {
  /// Every geography of `geo_type` (optionally only children of the
  /// geographies with code `within`) with its boundary and, where observed,
  /// the value of `slug` in `period`.
  pub async fn project_map(
    &self,
    geo_type: GeoType,
    period: DataPeriod,
    slug: &str,
    within: Option<&str>,
  ) -> Result<FeatureCollection> {
    self
      .bounded(async {
        let indicator = self.indicator(slug).await?;
        let geographies = self
          .geographies(&GeographyFilter {
            geo_type: Some(geo_type),
            parent_codes: within.map(|c| vec![c.to_owned()]),
            with_shape: true,
            ..GeographyFilter::default()
          })
          .await?;

        let observations = self
          .observations(&ObservationFilter {
            geography_ids: Some(geographies.iter().map(|g| g.id).collect()),
            indicator_ids: Some(vec![indicator.id]),
            data_period: Some(period),
            ..ObservationFilter::default()
          })
          .await?;
        let mut values = HashMap::new();
        for obs in observations {
          values.entry(obs.geography).or_insert(obs.value);
        }
        let parents = self
          .geographies_by_id(geographies.iter().filter_map(|g| g.parent).collect())
          .await?;
        debug!(
          %geo_type,
          features = geographies.len(),
          matched = values.len(),
          "projected map layer"
        );

        Ok(FeatureCollection {
          features: project_features(geographies, &indicator.slug, &values, &parents),
        })
      })
      .await
  }
}
