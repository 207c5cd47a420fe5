//! The aggregation and query-resolution engine.
//!
//! Given an (indicator, period, geography) filter triple, [`Engine`] walks the
//! geography and indicator hierarchies, joins observations from any
//! [`IndicatorStore`](drr_core::store::IndicatorStore) and reshapes the result
//! into table rows, map features, time trends and report models.
//!
//! Every public operation on [`Engine`] is bounded by the configured query
//! timeout and either completes or fails as a unit.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod geo;
pub mod indicator;
pub mod map;
pub mod rank;
pub mod report;
pub mod trend;
pub mod value;

pub use config::{EngineConfig, ReportConfig};
pub use engine::Engine;
pub use error::{Error, Result};

#[cfg(test)]
mod tests;
