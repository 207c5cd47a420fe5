//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
  Router,
  body::{Body, to_bytes},
  http::{Request, StatusCode},
};
use drr_core::{
  geography::{GeoType, NewGeography},
  indicator::NewIndicator,
  observation::NewObservation,
};
use drr_query::{Engine, EngineConfig};
use drr_store_sqlite::SqliteStore;
use serde_json::Value;
use tower::ServiceExt as _;

use crate::api_router;

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  let state = store
    .upsert_geography(NewGeography::new("State A", "1", GeoType::State))
    .await
    .unwrap();
  let x = store
    .upsert_geography(NewGeography::new("X", "10", GeoType::District).with_parent(state.id))
    .await
    .unwrap();
  let y = store
    .upsert_geography(NewGeography::new("Y", "11", GeoType::District).with_parent(state.id))
    .await
    .unwrap();
  let risk = store
    .upsert_indicator(NewIndicator::new("Risk score", "risk-score"))
    .await
    .unwrap();
  let june = "2024_06".parse().unwrap();
  store
    .replace_observations(vec![
      NewObservation::new(risk.id, x.id, june, Some(5.0)),
      NewObservation::new(risk.id, y.id, june, Some(3.0)),
    ])
    .await
    .unwrap();

  let engine = Engine::new(Arc::new(store), EngineConfig::default());
  api_router(Arc::new(engine))
}

async fn get(uri: &str) -> (StatusCode, Value) {
  let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
  let resp = app().await.oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn table_for_state_code() {
  let (status, body) = get("/table?indicator=risk-score&period=2024_06&code=1").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["period"], "2024_06");
  assert_eq!(body["rows"][0]["name"], "X");
  assert_eq!(body["rows"][0]["type"], "DISTRICT");
  assert_eq!(body["rows"][0]["region"]["code"], "1");
  assert_eq!(body["rows"][0]["indicators"]["risk-score"]["display"], "5");
  assert_eq!(body["rows"][1]["name"], "Y");
}

#[tokio::test]
async fn table_without_period_uses_latest() {
  let (status, body) = get("/table?code=10,11").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["period"], "2024_06");
  assert_eq!(body["rows"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn unknown_code_is_404() {
  let (status, body) = get("/geographies?code=999").await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn bad_parameters_are_400() {
  for uri in [
    "/table?type=PARISH",
    "/table?period=June",
    "/top-at-risk?order=sideways",
    "/trend?window=6M",
    "/report",
  ] {
    let (status, body) = get(uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    assert!(body["error"].is_string(), "{uri}");
  }
}

#[tokio::test]
async fn top_at_risk_respects_n() {
  let (status, body) = get("/top-at-risk?code=1&period=2024_06&n=1").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, serde_json::json!([{ "type": "DISTRICT", "name": "X", "code": "10", "value": 5.0 }]));
}

#[tokio::test]
async fn periods_and_indicators() {
  let (_, periods) = get("/periods").await;
  assert_eq!(periods, serde_json::json!(["2024_06"]));

  let (status, indicators) = get("/indicators?slug=risk-score").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(indicators[0]["slug"], "risk-score");
}

#[tokio::test]
async fn trend_window_keys() {
  let (status, body) = get("/trend?indicator=risk-score&code=1&period=2024_06&window=3M").await;
  assert_eq!(status, StatusCode::OK);
  let keys: Vec<_> = body["periods"].as_object().unwrap().keys().cloned().collect();
  assert_eq!(keys, vec!["2024_04", "2024_05", "2024_06"]);
}

#[tokio::test]
async fn map_layer() {
  let (status, body) = get("/map?type=DISTRICT&indicator=risk-score&code=1").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["type"], "FeatureCollection");
  assert_eq!(body["features"].as_array().map(Vec::len), Some(2));
  assert_eq!(body["features"][0]["properties"]["state-code"], "1");
}

#[tokio::test]
async fn report_for_state() {
  let (status, body) = get("/report?state=1&period=2024_06").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["title"], "State Report: State A | June 2024");
  assert_eq!(body["sections"][0]["kind"], "heading");
}
