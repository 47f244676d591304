//! Provider client boundary
//!
//! [`Provider`] is the read-only interface the sync engine consumes.
//! Each fetch distinguishes three outcomes: `Ok(Some(payload))` for data,
//! `Ok(None)` for legitimate absence (the provider has nothing for that
//! key), and `Err` for a provider or transport failure.

mod api;
mod session;

pub use api::ConnectClient;
pub use session::{ApiToken, SessionStore};

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::Result;
use crate::models::MetricType;

/// Read-only access to the fitness provider
pub trait Provider {
    /// One page of the activity list, newest first
    fn list_activities(
        &self,
        start: u32,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Value>>>;

    /// Full detail object for an activity, if the provider has one
    fn get_activity_detail(
        &self,
        activity_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Value>>>;

    /// Track payload (descriptor-indexed sample tuples) for an activity
    fn get_activity_track(
        &self,
        activity_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Value>>>;

    /// One day's payload for a date-keyed metric type
    fn get_daily_metric(
        &self,
        metric: MetricType,
        date: NaiveDate,
    ) -> impl std::future::Future<Output = Result<Option<Value>>>;
}
