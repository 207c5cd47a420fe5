//! Boundary geometry for geographies.
//!
//! Shapes are held as [`geo::MultiPolygon`] and stored and served as GeoJSON.
//! Positions are `[x, y]`, i.e. `[longitude, latitude]`. A plain `Polygon`
//! is promoted to a one-member `MultiPolygon` on read.

use std::str::FromStr;

use geo::{BoundingRect, Coord, Intersects, Rect};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The shape of a geography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "geojson::Geometry", into = "geojson::Geometry")]
pub struct Shape(pub geo::MultiPolygon<f64>);

impl Shape {
  /// The axis-aligned box around the exteriors, or `None` for an empty
  /// shape.
  pub fn bounding_box(&self) -> Option<BoundingBox> { self.0.bounding_rect().map(BoundingBox) }
}

impl From<geo::MultiPolygon<f64>> for Shape {
  fn from(polygons: geo::MultiPolygon<f64>) -> Self { Self(polygons) }
}

impl From<geo::Polygon<f64>> for Shape {
  fn from(polygon: geo::Polygon<f64>) -> Self { Self(geo::MultiPolygon::new(vec![polygon])) }
}

impl TryFrom<geojson::Geometry> for Shape {
  type Error = Error;

  fn try_from(geometry: geojson::Geometry) -> Result<Self> {
    match geo::Geometry::<f64>::try_from(geometry)? {
      geo::Geometry::Polygon(polygon) => Ok(polygon.into()),
      geo::Geometry::MultiPolygon(polygons) => Ok(polygons.into()),
      _ => Err(Error::UnsupportedGeometry),
    }
  }
}

impl From<Shape> for geojson::Geometry {
  fn from(shape: Shape) -> Self { geojson::Geometry::new(geojson::Value::from(&shape.0)) }
}

impl FromStr for Shape {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let geometry = geojson::Geometry::try_from(s.parse::<geojson::GeoJson>()?)?;
    Self::try_from(geometry)
  }
}

/// Extent of a shape along each axis.
///
/// Serialises as `[[min_y, max_y], [min_x, max_x]]`, latitude pair first,
/// which is the layout the dashboard map expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox(pub Rect<f64>);

impl BoundingBox {
  pub fn contains(&self, position: Coord<f64>) -> bool { self.0.intersects(&position) }

  pub fn to_pairs(&self) -> [[f64; 2]; 2] {
    let (min, max) = (self.0.min(), self.0.max());
    [[min.y, max.y], [min.x, max.x]]
  }
}

impl Serialize for BoundingBox {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.to_pairs().serialize(serializer)
  }
}

#[cfg(test)]
mod tests {
  use geo::CoordsIter;

  use super::*;

  fn square(x0: f64, y0: f64, size: f64) -> geo::Polygon<f64> {
    Rect::new((x0, y0), (x0 + size, y0 + size)).to_polygon()
  }

  #[test]
  fn bounding_box_spans_all_polygons() {
    let shape = Shape(geo::MultiPolygon::new(vec![
      square(90.0, 26.0, 1.0),
      square(92.5, 24.0, 0.5),
    ]));
    let bbox = shape.bounding_box().unwrap();
    assert_eq!(bbox.to_pairs(), [[24.0, 27.0], [90.0, 93.0]]);
    assert!(shape.0.coords_iter().all(|c| bbox.contains(c)));
  }

  #[test]
  fn empty_shape_has_no_bounding_box() {
    assert!(Shape(geo::MultiPolygon::new(vec![])).bounding_box().is_none());
  }

  #[test]
  fn bounding_box_serialises_latitude_pair_first() {
    let bbox = BoundingBox(Rect::new((90.0, 26.0), (91.0, 27.0)));
    let json = serde_json::to_value(bbox).unwrap();
    assert_eq!(json, serde_json::json!([[26.0, 27.0], [90.0, 91.0]]));
  }

  #[test]
  fn polygon_geojson_is_promoted() {
    let json = serde_json::json!({
      "type": "Polygon",
      "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
    });
    let shape: Shape = serde_json::from_value(json).unwrap();
    assert_eq!(shape.0.0.len(), 1);

    let out = serde_json::to_value(&shape).unwrap();
    assert_eq!(out["type"], "MultiPolygon");
    assert_eq!(out["coordinates"][0][0][1], serde_json::json!([1.0, 0.0]));
  }

  #[test]
  fn shape_parses_from_stored_text() {
    let shape: Shape = r#"{"type":"MultiPolygon","coordinates":[[[[0,0],[2,0],[2,1],[0,0]]]]}"#
      .parse()
      .unwrap();
    assert_eq!(shape.bounding_box().unwrap().to_pairs(), [[0.0, 1.0], [0.0, 2.0]]);
  }

  #[test]
  fn non_polygon_geometry_is_rejected() {
    let err = r#"{"type":"Point","coordinates":[91.0,26.0]}"#.parse::<Shape>().unwrap_err();
    assert!(matches!(err, Error::UnsupportedGeometry));
    assert!(matches!("not json".parse::<Shape>(), Err(Error::Serialization(_))));
  }
}
