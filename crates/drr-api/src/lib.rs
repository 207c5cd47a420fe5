//! JSON REST API for the flood-risk indicator engine.
//!
//! Exposes an axum [`Router`] backed by an [`Engine`] over any
//! [`IndicatorStore`]. All routes are read-only `GET`s; transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", drr_api::api_router(engine.clone()))
//! ```

pub mod catalog;
pub mod error;
pub mod report;
pub mod views;

use std::{str::FromStr, sync::Arc};

use axum::{Router, routing::get};
use drr_core::store::IndicatorStore;
use drr_query::Engine;

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Arc<Engine<S>>) -> Router<()>
where
  S: IndicatorStore + 'static,
{
  Router::new()
    // Catalog
    .route("/geographies", get(catalog::geographies::<S>))
    .route("/indicators", get(catalog::indicators::<S>))
    .route("/periods", get(catalog::periods::<S>))
    // Views
    .route("/table", get(views::table::<S>))
    .route("/top-at-risk", get(views::top_at_risk::<S>))
    .route("/map", get(views::map::<S>))
    .route("/trend", get(views::trend::<S>))
    // Report
    .route("/report", get(report::handler::<S>))
    .with_state(engine)
}

/// Parses an optional query parameter; blank counts as absent.
pub(crate) fn parse_param<T>(raw: Option<&str>) -> Result<Option<T>, ApiError>
where
  T: FromStr,
  ApiError: From<T::Err>,
{
  match raw.map(str::trim).filter(|s| !s.is_empty()) {
    Some(s) => Ok(Some(s.parse()?)),
    None => Ok(None),
  }
}

#[cfg(test)]
mod tests;
