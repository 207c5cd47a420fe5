//! The renderer-neutral report model.

use drr_core::{geography::GeographyDescriptor, period::DataPeriod};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportModel {
  pub title:    String,
  pub state:    GeographyDescriptor,
  pub period:   DataPeriod,
  pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Section {
  Heading {
    level: u8,
    text:  String,
  },
  Paragraph {
    text: String,
  },
  Table {
    title:  String,
    header: Vec<String>,
    rows:   Vec<Vec<String>>,
  },
  ChartPlaceholder(ChartSpec),
  ListBlock {
    title: String,
    items: Vec<String>,
  },
}

impl Section {
  pub fn heading(level: u8, text: impl Into<String>) -> Self {
    Self::Heading { level, text: text.into() }
  }

  pub fn paragraph(text: impl Into<String>) -> Self { Self::Paragraph { text: text.into() } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChartType {
  BarVertical,
  Line,
}

/// Everything a chart renderer needs, data included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
  pub chart_type:     ChartType,
  pub title:          String,
  pub x_axis_column:  String,
  pub y_axis_column:  String,
  pub aggregate_type: String,
  pub show_legend:    bool,
  pub data:           Vec<ChartDatum>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDatum {
  pub x:      String,
  pub y:      Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub series: Option<String>,
}
