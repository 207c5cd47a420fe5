//! Dashboard views: table, ranking, map layer and time trend.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use drr_core::{geography::GeoType, period::DataPeriod, store::IndicatorStore};
use drr_query::{
  Engine,
  aggregate::Table,
  geo::GeoFilter,
  map::FeatureCollection,
  rank::{RankOrder, RankedGeography},
  trend::{TimeTrend, TrendWindow},
};
use serde::Deserialize;

use crate::{error::ApiError, parse_param};

// ─── Table ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct TableParams {
  pub indicator: Option<String>,
  pub period:    Option<String>,
  /// Comma-separated geography codes.
  pub code:      Option<String>,
  #[serde(rename = "type")]
  pub geo_type:  Option<String>,
}

/// `GET /table[?indicator=...][&period=YYYY_MM][&code=...][&type=...]`
pub async fn table<S>(
  State(engine): State<Arc<Engine<S>>>,
  Query(params): Query<TableParams>,
) -> Result<Json<Table>, ApiError>
where
  S: IndicatorStore + 'static,
{
  let period = parse_param::<DataPeriod>(params.period.as_deref())?;
  let geo = GeoFilter::parse(params.code.as_deref(), params.geo_type.as_deref())?;
  let table = engine
    .table(params.indicator.as_deref(), period, &geo)
    .await?;
  Ok(Json(table))
}

// ─── Top at risk ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct TopParams {
  pub period: Option<String>,
  /// State scope.
  pub code:   Option<String>,
  pub n:      Option<usize>,
  /// `desc` (default) or `asc`.
  pub order:  Option<String>,
}

/// `GET /top-at-risk[?period=...][&code=...][&n=...][&order=asc|desc]`
pub async fn top_at_risk<S>(
  State(engine): State<Arc<Engine<S>>>,
  Query(params): Query<TopParams>,
) -> Result<Json<Vec<RankedGeography>>, ApiError>
where
  S: IndicatorStore + 'static,
{
  let period = engine
    .resolve_period(parse_param(params.period.as_deref())?)
    .await?;
  let order = parse_param::<RankOrder>(params.order.as_deref())?.unwrap_or_default();
  let n = params.n.unwrap_or(engine.config().top_n);
  let ranked = engine
    .top_n_at_risk(period, params.code.as_deref(), n, order)
    .await?;
  Ok(Json(ranked))
}

// ─── Map ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct MapParams {
  #[serde(rename = "type")]
  pub geo_type:  Option<String>,
  pub period:    Option<String>,
  pub indicator: Option<String>,
  /// Restrict to children of the geographies with this code.
  pub code:      Option<String>,
}

/// `GET /map[?type=...][&period=...][&indicator=...][&code=...]`
pub async fn map<S>(
  State(engine): State<Arc<Engine<S>>>,
  Query(params): Query<MapParams>,
) -> Result<Json<FeatureCollection>, ApiError>
where
  S: IndicatorStore + 'static,
{
  let geo_type = parse_param::<GeoType>(params.geo_type.as_deref())?
    .unwrap_or(engine.config().default_geo_type);
  let period = engine
    .resolve_period(parse_param(params.period.as_deref())?)
    .await?;
  let slug = params
    .indicator
    .as_deref()
    .unwrap_or(&engine.config().composite_slug);
  let layer = engine
    .project_map(geo_type, period, slug, params.code.as_deref())
    .await?;
  Ok(Json(layer))
}

// ─── Trend ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct TrendParams {
  pub indicator: Option<String>,
  pub code:      Option<String>,
  /// Anchor month of the window.
  pub period:    Option<String>,
  /// `3M`, `12M` (default) or `ALL`.
  pub window:    Option<String>,
}

/// `GET /trend[?indicator=...][&code=...][&period=...][&window=3M|12M|ALL]`
pub async fn trend<S>(
  State(engine): State<Arc<Engine<S>>>,
  Query(params): Query<TrendParams>,
) -> Result<Json<TimeTrend>, ApiError>
where
  S: IndicatorStore + 'static,
{
  let anchor = engine
    .resolve_period(parse_param(params.period.as_deref())?)
    .await?;
  let window = parse_param::<TrendWindow>(params.window.as_deref())?.unwrap_or_default();
  let slug = params
    .indicator
    .as_deref()
    .unwrap_or(&engine.config().composite_slug);
  let trend = engine
    .time_trend(slug, params.code.as_deref(), anchor, window)
    .await?;
  Ok(Json(trend))
}
