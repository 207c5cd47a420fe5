//! Handler for `GET /report`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use drr_core::store::IndicatorStore;
use drr_query::{Engine, report::ReportModel};
use serde::Deserialize;

use crate::{error::ApiError, parse_param};

#[derive(Debug, Deserialize, Default)]
pub struct ReportParams {
  /// State code.
  pub state:  Option<String>,
  pub period: Option<String>,
}

/// `GET /report?state=...[&period=YYYY_MM]`
pub async fn handler<S>(
  State(engine): State<Arc<Engine<S>>>,
  Query(params): Query<ReportParams>,
) -> Result<Json<ReportModel>, ApiError>
where
  S: IndicatorStore + 'static,
{
  let state = params
    .state
    .as_deref()
    .filter(|s| !s.trim().is_empty())
    .ok_or_else(|| ApiError::BadRequest("missing `state` parameter".to_owned()))?;
  let period = engine
    .resolve_period(parse_param(params.period.as_deref())?)
    .await?;
  let report = engine.build_report_model(state.trim(), period).await?;
  Ok(Json(report))
}
