//! Geography hierarchy resolution.
//!
//! A geography filter is a list of codes plus an optional level. The legacy
//! single-code rule is ambiguous (a state code means "the state's districts",
//! a district code means "this district and its circles"), so it is kept only
//! as a dispatcher over [`Engine::resolve_exact`] and
//! [`Engine::resolve_with_children`].

use std::collections::HashMap;

use drr_core::{
  geography::{GeoType, Geography, GeographyDescriptor, GeographyId},
  store::{GeographyFilter, IndicatorStore},
};
use tracing::debug;

use crate::{Engine, Error, Result};

/// A request's geography filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoFilter {
  pub codes:    Vec<String>,
  pub geo_type: Option<GeoType>,
}

impl GeoFilter {
  /// Parses the raw query parameters: a comma-separated code list and a
  /// type name.
  pub fn parse(codes: Option<&str>, geo_type: Option<&str>) -> Result<Self> {
    let codes: Vec<String> = codes
      .map(|raw| {
        raw
          .split(',')
          .map(str::trim)
          .filter(|c| !c.is_empty())
          .map(str::to_owned)
          .collect()
      })
      .unwrap_or_default();
    let geo_type = geo_type
      .filter(|t| !t.trim().is_empty())
      .map(str::parse::<GeoType>)
      .transpose()?;
    Ok(Self { codes, geo_type })
  }

  pub fn code(code: impl Into<String>) -> Self {
    Self { codes: vec![code.into()], geo_type: None }
  }
}

/// How a [`GeoFilter`] was interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
  /// No codes: every geography of this level.
  Typed(GeoType),
  /// Several codes: exactly those geographies.
  Exact,
  /// One code: the matching geographies (`roots`) and their children.
  Expanded { roots: Vec<GeographyId> },
}

#[derive(Debug, Clone)]
pub struct ResolvedGeographies {
  pub resolution:  Resolution,
  /// Ordered by name then id.
  pub geographies: Vec<Geography>,
  /// Parent descriptor of every resolved geography that has a parent.
  pub parents:     HashMap<GeographyId, GeographyDescriptor>,
}

impl ResolvedGeographies {
  pub fn ids(&self) -> Vec<GeographyId> { self.geographies.iter().map(|g| g.id).collect() }

  pub fn parent_of(&self, geography: &Geography) -> Option<&GeographyDescriptor> {
    geography.parent.and_then(|p| self.parents.get(&p))
  }

  pub fn is_empty(&self) -> bool { self.geographies.is_empty() }
}

impl<S: IndicatorStore> Engine<S> {
  /// Resolves a filter by the legacy rule: one code expands to its children,
  /// several codes are exact, none selects a whole level (the type filter is
  /// only consulted in that last case).
  pub async fn resolve_geographies(&self, filter: &GeoFilter) -> Result<ResolvedGeographies> {
    self
      .bounded(async {
        match filter.codes.as_slice() {
          [] => {
            let geo_type = filter.geo_type.unwrap_or(self.config().default_geo_type);
            self.resolve_typed(geo_type).await
          }
          [code] => self.resolve_with_children(code).await,
          codes => self.resolve_exact(codes).await,
        }
      })
      .await
  }

  /// The geographies whose code is in `codes`. No expansion.
  pub async fn resolve_exact(&self, codes: &[String]) -> Result<ResolvedGeographies> {
    let geographies = self
      .geographies(&GeographyFilter::by_codes(codes.iter().cloned()))
      .await?;
    debug!(?codes, matched = geographies.len(), "resolved exact geographies");
    self.with_parents(Resolution::Exact, geographies).await
  }

  /// The geographies with `code` together with every geography whose parent
  /// has that code. Errors with [`Error::NotFound`] when both are empty.
  pub async fn resolve_with_children(&self, code: &str) -> Result<ResolvedGeographies> {
    let roots = self
      .geographies(&GeographyFilter::by_codes([code]))
      .await?;
    let children = self
      .geographies(&GeographyFilter::children_of_codes([code]))
      .await?;
    if roots.is_empty() && children.is_empty() {
      return Err(Error::NotFound(format!("geography with code {code:?}")));
    }
    debug!(
      code,
      roots = roots.len(),
      children = children.len(),
      "expanded geography code"
    );

    let root_ids: Vec<GeographyId> = roots.iter().map(|g| g.id).collect();
    let mut geographies = roots;
    for child in children {
      if !geographies.iter().any(|g| g.id == child.id) {
        geographies.push(child);
      }
    }
    geographies.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    self
      .with_parents(Resolution::Expanded { roots: root_ids }, geographies)
      .await
  }

  async fn resolve_typed(&self, geo_type: GeoType) -> Result<ResolvedGeographies> {
    let geographies = self
      .geographies(&GeographyFilter::of_type(geo_type))
      .await?;
    debug!(%geo_type, matched = geographies.len(), "resolved geography level");
    self.with_parents(Resolution::Typed(geo_type), geographies).await
  }

  async fn with_parents(
    &self,
    resolution: Resolution,
    geographies: Vec<Geography>,
  ) -> Result<ResolvedGeographies> {
    let parents = self
      .geographies_by_id(geographies.iter().filter_map(|g| g.parent).collect())
      .await?
      .into_iter()
      .map(|(id, g)| (id, g.descriptor()))
      .collect();
    Ok(ResolvedGeographies { resolution, geographies, parents })
  }
}
