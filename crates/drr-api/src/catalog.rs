//! Catalog lookups: geographies, indicators and stored periods.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/geographies` | `?code=a,b&type=DISTRICT` |
//! | `GET`  | `/indicators`  | `?slug=` selects an indicator and its children |
//! | `GET`  | `/periods`     | Oldest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use drr_core::{
  geography::Geography, indicator::Indicator, period::DataPeriod, store::IndicatorStore,
};
use drr_query::{Engine, geo::GeoFilter};
use serde::Deserialize;

use crate::error::ApiError;

// ─── Geographies ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct GeographyParams {
  /// Comma-separated geography codes.
  pub code:     Option<String>,
  #[serde(rename = "type")]
  pub geo_type: Option<String>,
}

/// `GET /geographies[?code=...][&type=...]`
pub async fn geographies<S>(
  State(engine): State<Arc<Engine<S>>>,
  Query(params): Query<GeographyParams>,
) -> Result<Json<Vec<Geography>>, ApiError>
where
  S: IndicatorStore + 'static,
{
  let filter = GeoFilter::parse(params.code.as_deref(), params.geo_type.as_deref())?;
  let resolved = engine.resolve_geographies(&filter).await?;
  Ok(Json(resolved.geographies))
}

// ─── Indicators ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct IndicatorParams {
  pub slug: Option<String>,
}

/// `GET /indicators[?slug=...]`
pub async fn indicators<S>(
  State(engine): State<Arc<Engine<S>>>,
  Query(params): Query<IndicatorParams>,
) -> Result<Json<Vec<Indicator>>, ApiError>
where
  S: IndicatorStore + 'static,
{
  let selection = engine.resolve_indicators(params.slug.as_deref()).await?;
  Ok(Json(selection.indicators))
}

// ─── Periods ─────────────────────────────────────────────────────────────────

/// `GET /periods`
pub async fn periods<S>(
  State(engine): State<Arc<Engine<S>>>,
) -> Result<Json<Vec<DataPeriod>>, ApiError>
where
  S: IndicatorStore + 'static,
{
  Ok(Json(engine.periods().await?))
}
