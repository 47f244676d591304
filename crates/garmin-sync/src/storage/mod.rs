//! Storage layer
//!
//! One SQLite database holds every summary and detail table plus the sync
//! records. The store is opened for the duration of a run and dropped when
//! the run ends; overlapping processes are safe because all writes resolve
//! conflicts at the row level.

mod schema;
mod store;

pub use store::{MetricStore, TABLES};
