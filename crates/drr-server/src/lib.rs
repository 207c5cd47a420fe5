//! HTTP server wiring for the flood-risk indicator API.
//!
//! Mounts [`drr_api::api_router`] under `/api` with request tracing. The
//! binary in `main.rs` loads [`ServerConfig`] and opens the SQLite store.

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use drr_core::store::IndicatorStore;
use drr_query::{Engine, EngineConfig};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `DRR_`-prefixed environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  pub store_path: PathBuf,
  #[serde(default)]
  pub engine:     EngineConfig,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the application router: the JSON API under `/api`.
pub fn router<S>(engine: Arc<Engine<S>>) -> Router
where
  S: IndicatorStore + 'static,
{
  Router::new()
    .nest("/api", drr_api::api_router(engine))
    .layer(TraceLayer::new_for_http())
}
