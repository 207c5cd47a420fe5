//! Indicators: the catalog of metrics observations are recorded against.
//!
//! Indicators form a shallow forest: a parent-less indicator is a composite
//! factor (e.g. the overall risk score), its children are sub-factors.

use serde::{Deserialize, Serialize};

use crate::geography::GeographyId;

/// Store-assigned handle of an [`Indicator`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct IndicatorId(pub i64);

/// Store-assigned handle of a [`Unit`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UnitId(pub i64);

/// A unit of measure; lookup-only from the query side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
  pub id:     UnitId,
  /// e.g. `"percentage"`, `"rupees"`, `"score"`.
  pub name:   String,
  /// e.g. `"%"`, `"₹"`; empty for plain numbers.
  pub symbol: String,
}

impl Unit {
  /// The text appended to a rendered value.
  pub fn label(&self) -> &str {
    if self.symbol.is_empty() { &self.name } else { &self.symbol }
  }
}

/// A named metric definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
  pub id:                IndicatorId,
  pub name:              String,
  /// Unique external key within a geography scope.
  pub slug:              String,
  pub long_description:  Option<String>,
  pub short_description: Option<String>,
  pub category:          Option<String>,
  pub unit:              Option<Unit>,
  /// Set when the indicator only applies within one state.
  pub geography_scope:   Option<GeographyId>,
  pub parent:            Option<IndicatorId>,
  pub display_order:     i32,
  pub is_visible:        bool,
  pub data_source:       Option<String>,
}

impl Indicator {
  pub fn is_composite(&self) -> bool { self.parent.is_none() }

  pub fn unit_label(&self) -> Option<&str> { self.unit.as_ref().map(Unit::label) }
}

/// Input to an ingestion upsert keyed by `(slug, geography_scope)`.
#[derive(Debug, Clone)]
pub struct NewIndicator {
  pub name:              String,
  pub slug:              String,
  pub long_description:  Option<String>,
  pub short_description: Option<String>,
  pub category:          Option<String>,
  pub unit:              Option<UnitId>,
  pub geography_scope:   Option<GeographyId>,
  pub parent:            Option<IndicatorId>,
  pub display_order:     i32,
  pub is_visible:        bool,
  pub data_source:       Option<String>,
}

impl NewIndicator {
  /// Convenience constructor: visible, unscoped, no unit, no parent.
  pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
    Self {
      name:              name.into(),
      slug:              slug.into(),
      long_description:  None,
      short_description: None,
      category:          None,
      unit:              None,
      geography_scope:   None,
      parent:            None,
      display_order:     0,
      is_visible:        true,
      data_source:       None,
    }
  }

  pub fn with_parent(mut self, parent: IndicatorId) -> Self {
    self.parent = Some(parent);
    self
  }

  pub fn with_unit(mut self, unit: UnitId) -> Self {
    self.unit = Some(unit);
    self
  }

  pub fn hidden(mut self) -> Self {
    self.is_visible = false;
    self
  }
}
