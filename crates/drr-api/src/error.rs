//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("{0}")]
  Timeout(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<drr_query::Error> for ApiError {
  fn from(e: drr_query::Error) -> Self {
    use drr_query::Error as E;
    match e {
      E::NotFound(m) => Self::NotFound(m),
      E::AmbiguousFilter(m) => Self::BadRequest(m),
      gap @ E::DataQualityGap { .. } => Self::NotFound(gap.to_string()),
      timeout @ E::Timeout(_) => Self::Timeout(timeout.to_string()),
      E::Core(core) => Self::BadRequest(core.to_string()),
      E::Store(source) => Self::Store(source),
    }
  }
}

impl From<drr_core::Error> for ApiError {
  fn from(e: drr_core::Error) -> Self { Self::BadRequest(e.to_string()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Timeout(m) => (StatusCode::GATEWAY_TIMEOUT, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
