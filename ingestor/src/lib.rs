//! Sensor reading ingestion, query and retention.
//!
//! Readings from many devices land in a single PostgreSQL table. The
//! [`store::ReadingStore`] owns every query against it; [`pagination`]
//! normalizes caller input before it reaches the store, and
//! [`retention::RetentionScheduler`] prunes old rows in bounded batches.

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod pagination;
pub mod rest;
pub mod retention;
pub mod schema;
pub mod shutdown;
pub mod store;
pub mod validate;

pub use errors::{Error, Result};
pub use model::{HealthReport, HealthStatus, Reading, ReadingFilter, ReadingValue, Statistics};
pub use pagination::Pagination;
pub use store::{ReadingStore, StoreOptions};
