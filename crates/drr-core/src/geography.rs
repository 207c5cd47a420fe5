//! Geography — a node in the administrative-boundary forest.
//!
//! Parent links are plain [`GeographyId`] handles. Walking the tree (children
//! of, ancestors of) is a store query by parent-handle equality, never pointer
//! chasing.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, geometry::Shape};

/// Store-assigned handle of a [`Geography`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GeographyId(pub i64);

/// Administrative level of a geography.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeoType {
  Country,
  State,
  Ut,
  District,
  Block,
  Village,
  RevenueCircle,
  SubDistrict,
}

impl GeoType {
  pub const ALL: [GeoType; 8] = [
    GeoType::Country,
    GeoType::State,
    GeoType::Ut,
    GeoType::District,
    GeoType::Block,
    GeoType::Village,
    GeoType::RevenueCircle,
    GeoType::SubDistrict,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Country => "COUNTRY",
      Self::State => "STATE",
      Self::Ut => "UT",
      Self::District => "DISTRICT",
      Self::Block => "BLOCK",
      Self::Village => "VILLAGE",
      Self::RevenueCircle => "REVENUE_CIRCLE",
      Self::SubDistrict => "SUB_DISTRICT",
    }
  }

  /// Feature-property key carrying the code of a parent of this type, e.g.
  /// `district-code`.
  pub fn code_key(&self) -> String {
    format!("{}-code", self.as_str().to_ascii_lowercase().replace('_', "-"))
  }

  /// Title-case label for table headers, e.g. `Revenue circle`.
  pub fn label(&self) -> &'static str {
    match self {
      Self::Country => "Country",
      Self::State => "State",
      Self::Ut => "Union territory",
      Self::District => "District",
      Self::Block => "Block",
      Self::Village => "Village",
      Self::RevenueCircle => "Revenue circle",
      Self::SubDistrict => "Sub-district",
    }
  }

  /// Revenue circles and sub-districts are the units below a district.
  pub fn is_sub_district(&self) -> bool {
    matches!(self, Self::RevenueCircle | Self::SubDistrict)
  }
}

impl fmt::Display for GeoType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for GeoType {
  type Err = Error;

  /// Case-insensitive; spaces and hyphens are read as underscores so the
  /// legacy `"REVENUE CIRCLE"` spelling is accepted.
  fn from_str(s: &str) -> Result<Self> {
    let normalised = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
    GeoType::ALL
      .into_iter()
      .find(|t| t.as_str() == normalised)
      .ok_or_else(|| Error::UnknownGeoType(s.to_owned()))
  }
}

/// A node in the administrative-boundary forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geography {
  pub id:       GeographyId,
  pub name:     String,
  /// External identifier; unique only together with `parent`.
  pub code:     String,
  #[serde(rename = "type")]
  pub geo_type: GeoType,
  pub parent:   Option<GeographyId>,
  /// Loaded only when requested, see
  /// [`GeographyFilter::with_shape`](crate::store::GeographyFilter).
  #[serde(skip_serializing_if = "Option::is_none")]
  pub shape:    Option<Shape>,
}

impl Geography {
  pub fn descriptor(&self) -> GeographyDescriptor {
    GeographyDescriptor {
      geo_type: self.geo_type,
      name:     self.name.clone(),
      code:     self.code.clone(),
    }
  }
}

/// The public face of a geography: no handles, no geometry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeographyDescriptor {
  #[serde(rename = "type")]
  pub geo_type: GeoType,
  pub name:     String,
  pub code:     String,
}

/// Input to an ingestion upsert; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewGeography {
  pub name:     String,
  pub code:     String,
  pub geo_type: GeoType,
  pub parent:   Option<GeographyId>,
  pub shape:    Option<Shape>,
}

impl NewGeography {
  pub fn new(name: impl Into<String>, code: impl Into<String>, geo_type: GeoType) -> Self {
    Self {
      name: name.into(),
      code: code.into(),
      geo_type,
      parent: None,
      shape: None,
    }
  }

  pub fn with_parent(mut self, parent: GeographyId) -> Self {
    self.parent = Some(parent);
    self
  }

  pub fn with_shape(mut self, shape: Shape) -> Self {
    self.shape = Some(shape);
    self
  }
}
