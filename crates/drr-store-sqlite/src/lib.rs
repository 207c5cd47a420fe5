//! SQLite backend for the flood-risk indicator store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Besides the read-only
//! [`IndicatorStore`](drr_core::store::IndicatorStore) implementation,
//! [`SqliteStore`] carries the idempotent write path used by ingestion.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
