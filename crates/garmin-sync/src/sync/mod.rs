//! Sync engine
//!
//! Fetches, normalizes, and persists one run's worth of data: activity
//! ingestion first (id-addressed, deduplicated by summary existence), then
//! each date-keyed metric over the lookback window (gated by sync records).
//! A single sequential worker; every fetch is awaited before the next
//! begins.
//!
//! Failure isolation: one bad activity or day never aborts the run. Only
//! authentication failures are fatal; the next scheduled invocation
//! retries independently.

use chrono::{Duration, NaiveDate, Utc};
use serde_json::Value;

use crate::client::Provider;
use crate::error::{Result, SyncError};
use crate::models::{MetricType, SyncStatus};
use crate::normalize::{activity, heart_rate, hrv, respiration, sleep, spo2, stress};
use crate::storage::MetricStore;

/// Data source label recorded with every sync record
pub const SOURCE: &str = "garmin";

/// Activity list page size
const ACTIVITY_PAGE_SIZE: u32 = 20;

/// Counters for one sync run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    pub saved: u32,
    pub skipped: u32,
    pub no_data: u32,
    pub failed: u32,
}

impl std::fmt::Display for SyncStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} saved, {} skipped, {} without data, {} failed",
            self.saved, self.skipped, self.no_data, self.failed
        )
    }
}

enum ActivityOutcome {
    Saved { id: String, points: usize },
    Skipped(String),
}

/// Sync engine orchestrating one run against the provider
pub struct SyncEngine<P: Provider> {
    provider: P,
    store: MetricStore,
}

impl<P: Provider> SyncEngine<P> {
    pub fn new(provider: P, store: MetricStore) -> Self {
        Self { provider, store }
    }

    /// Access the underlying store (status reporting, tests)
    pub fn store(&self) -> &MetricStore {
        &self.store
    }

    /// Run a full sync pass over the trailing `lookback_days` calendar days
    pub async fn run(&mut self, lookback_days: u32) -> Result<SyncStats> {
        let mut stats = SyncStats::default();

        self.sync_activities(lookback_days, &mut stats).await?;

        for metric in MetricType::DAILY {
            self.sync_daily_metric(metric, lookback_days, &mut stats)
                .await?;
        }

        Ok(stats)
    }

    // =========================================================================
    // Activities
    // =========================================================================

    /// Ingest activities newer than the lookback cutoff.
    ///
    /// The list is paginated newest-first; pagination stops at the first
    /// item older than the cutoff. Already-stored ids are skipped without
    /// any further fetch.
    pub async fn sync_activities(
        &mut self,
        lookback_days: u32,
        stats: &mut SyncStats,
    ) -> Result<()> {
        println!("Fetching activities from the last {} days...", lookback_days);

        let cutoff_ms = (Utc::now() - Duration::days(lookback_days as i64)).timestamp_millis();
        let mut collected: Vec<Value> = Vec::new();
        let mut start = 0;

        'pages: loop {
            let page = self
                .provider
                .list_activities(start, ACTIVITY_PAGE_SIZE)
                .await?;
            if page.is_empty() {
                break;
            }
            for item in page {
                let begin_ts = item
                    .get("beginTimestamp")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0);
                if begin_ts < cutoff_ms {
                    break 'pages;
                }
                collected.push(item);
            }
            start += ACTIVITY_PAGE_SIZE;
        }

        println!("  {} activities listed", collected.len());

        for item in &collected {
            match self.ingest_activity(item).await {
                Ok(ActivityOutcome::Saved { id, points }) => {
                    stats.saved += 1;
                    if points > 0 {
                        println!("  {}: saved ({} track points)", id, points);
                    } else {
                        println!("  {}: saved", id);
                    }
                }
                Ok(ActivityOutcome::Skipped(id)) => {
                    stats.skipped += 1;
                    println!("  {}: already stored", id);
                }
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => {
                    stats.failed += 1;
                    let id = activity::activity_id(item).unwrap_or_else(|| "?".to_string());
                    eprintln!("  {}: failed: {}", id, e);
                }
            }
        }

        Ok(())
    }

    async fn ingest_activity(&mut self, item: &Value) -> Result<ActivityOutcome> {
        let id = activity::activity_id(item)
            .ok_or_else(|| SyncError::invalid_response("Missing activityId"))?;

        if self.store.activity_exists(&id)? {
            return Ok(ActivityOutcome::Skipped(id));
        }

        // Absent detail degrades summary quality but does not abort
        let detail = self
            .tolerate(self.provider.get_activity_detail(&id).await, &id)?;
        let summary = activity::parse_summary(item, detail.as_ref())?;

        let mut points = Vec::new();
        let has_gps = item
            .get("hasPolyline")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if has_gps {
            if let Some(track) = self.tolerate(self.provider.get_activity_track(&id).await, &id)? {
                let start_gmt = detail
                    .as_ref()
                    .and_then(|d| d.get("summaryDTO"))
                    .and_then(|s| s.get("startTimeGMT"))
                    .and_then(|v| v.as_str());
                points = activity::parse_track_points(&track, start_gmt);
            }
        }

        self.store.write_activity(&summary, &points)?;
        Ok(ActivityOutcome::Saved {
            id,
            points: points.len(),
        })
    }

    /// Downgrade a non-fatal fetch failure to absence
    fn tolerate(&self, result: Result<Option<Value>>, id: &str) -> Result<Option<Value>> {
        match result {
            Err(e) if is_fatal(&e) => Err(e),
            Err(e) => {
                eprintln!("  {}: fetch failed, continuing without: {}", id, e);
                Ok(None)
            }
            Ok(value) => Ok(value),
        }
    }

    // =========================================================================
    // Date-keyed metrics
    // =========================================================================

    /// Ingest one metric type over the lookback window, yesterday backwards
    pub async fn sync_daily_metric(
        &mut self,
        metric: MetricType,
        lookback_days: u32,
        stats: &mut SyncStats,
    ) -> Result<()> {
        println!("Syncing {}...", metric);
        let today = Utc::now().date_naive();

        for i in 1..=lookback_days as i64 {
            let date = today - Duration::days(i);

            if self.store.is_synced(SOURCE, metric, date)? {
                stats.skipped += 1;
                println!("  {}: already synced", date);
                continue;
            }

            match self.provider.get_daily_metric(metric, date).await {
                Ok(Some(payload)) => match self.persist_daily(metric, date, &payload) {
                    Ok(true) => {
                        self.store
                            .mark_synced(SOURCE, metric, date, SyncStatus::Success, None, None)?;
                        stats.saved += 1;
                        println!("  {}: saved", date);
                    }
                    Ok(false) => {
                        // Nothing to persist; the day stays eligible for retry
                        stats.no_data += 1;
                        println!("  {}: no data", date);
                    }
                    Err(e) => {
                        self.store.mark_synced(
                            SOURCE,
                            metric,
                            date,
                            SyncStatus::Failed,
                            None,
                            Some(&e.to_string()),
                        )?;
                        stats.failed += 1;
                        eprintln!("  {}: failed: {}", date, e);
                    }
                },
                Ok(None) => {
                    stats.no_data += 1;
                    println!("  {}: no data", date);
                }
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => {
                    self.store.mark_synced(
                        SOURCE,
                        metric,
                        date,
                        SyncStatus::Failed,
                        None,
                        Some(&e.to_string()),
                    )?;
                    stats.failed += 1;
                    eprintln!("  {}: failed: {}", date, e);
                }
            }
        }

        Ok(())
    }

    /// Normalize and persist one day's payload.
    /// Returns false when the payload carries no usable data.
    fn persist_daily(&mut self, metric: MetricType, date: NaiveDate, payload: &Value) -> Result<bool> {
        match metric {
            MetricType::HeartRate => {
                let (summary, samples) = heart_rate::parse(date, payload);
                self.store.write_heart_rate_day(&summary, &samples)?;
                Ok(true)
            }
            MetricType::Sleep => match sleep::parse(date, payload) {
                Some((summary, stages)) => {
                    self.store.write_sleep_day(&summary, &stages)?;
                    Ok(true)
                }
                None => Ok(false),
            },
            MetricType::Stress => {
                let (summary, samples) = stress::parse(date, payload);
                self.store.write_stress_day(&summary, &samples)?;
                Ok(true)
            }
            MetricType::Spo2 => {
                let (summary, samples) = spo2::parse(date, payload);
                self.store.write_spo2_day(&summary, &samples)?;
                Ok(true)
            }
            MetricType::Respiration => {
                let (summary, samples) = respiration::parse(date, payload);
                self.store.write_respiration_day(&summary, &samples)?;
                Ok(true)
            }
            MetricType::Hrv => {
                let summary = hrv::parse(date, payload);
                self.store.write_hrv_day(&summary)?;
                Ok(true)
            }
        }
    }
}

/// Authentication failures abort the whole invocation
fn is_fatal(error: &SyncError) -> bool {
    matches!(
        error,
        SyncError::NotAuthenticated | SyncError::Authentication(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::{HashMap, HashSet};

    use serde_json::json;

    fn daily_key(metric: MetricType, date: NaiveDate) -> String {
        format!("{}:{}", metric, date)
    }

    /// In-process provider playing back scripted payloads and counting calls
    #[derive(Default)]
    struct ScriptedProvider {
        activities: Vec<Value>,
        details: HashMap<String, Value>,
        tracks: HashMap<String, Value>,
        daily: HashMap<String, Value>,
        failing_daily: HashSet<String>,
        list_calls: Cell<u32>,
        detail_calls: Cell<u32>,
        track_calls: Cell<u32>,
        daily_calls: Cell<u32>,
    }

    impl Provider for ScriptedProvider {
        async fn list_activities(&self, start: u32, limit: u32) -> Result<Vec<Value>> {
            self.list_calls.set(self.list_calls.get() + 1);
            Ok(self
                .activities
                .iter()
                .skip(start as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn get_activity_detail(&self, activity_id: &str) -> Result<Option<Value>> {
            self.detail_calls.set(self.detail_calls.get() + 1);
            Ok(self.details.get(activity_id).cloned())
        }

        async fn get_activity_track(&self, activity_id: &str) -> Result<Option<Value>> {
            self.track_calls.set(self.track_calls.get() + 1);
            Ok(self.tracks.get(activity_id).cloned())
        }

        async fn get_daily_metric(
            &self,
            metric: MetricType,
            date: NaiveDate,
        ) -> Result<Option<Value>> {
            self.daily_calls.set(self.daily_calls.get() + 1);
            let key = daily_key(metric, date);
            if self.failing_daily.contains(&key) {
                return Err(SyncError::Other("scripted failure".to_string()));
            }
            Ok(self.daily.get(&key).cloned())
        }
    }

    fn engine(provider: ScriptedProvider) -> SyncEngine<ScriptedProvider> {
        SyncEngine::new(provider, MetricStore::open_in_memory().unwrap())
    }

    fn recent_ts() -> i64 {
        Utc::now().timestamp_millis() - 3_600_000
    }

    fn yesterday() -> NaiveDate {
        Utc::now().date_naive() - Duration::days(1)
    }

    #[tokio::test]
    async fn test_sync_gate_suppresses_fetch() {
        let provider = ScriptedProvider::default();
        let mut engine = engine(provider);

        engine
            .store
            .mark_synced(SOURCE, MetricType::Stress, yesterday(), SyncStatus::Success, None, None)
            .unwrap();

        let mut stats = SyncStats::default();
        engine
            .sync_daily_metric(MetricType::Stress, 1, &mut stats)
            .await
            .unwrap();

        assert_eq!(engine.provider.daily_calls.get(), 0);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.saved, 0);
    }

    #[tokio::test]
    async fn test_failed_day_recorded_and_retried() {
        let mut provider = ScriptedProvider::default();
        provider
            .failing_daily
            .insert(daily_key(MetricType::Hrv, yesterday()));
        let mut engine = engine(provider);

        let mut stats = SyncStats::default();
        engine
            .sync_daily_metric(MetricType::Hrv, 1, &mut stats)
            .await
            .unwrap();

        assert_eq!(stats.failed, 1);
        let record = engine
            .store
            .get_sync_record(SOURCE, MetricType::Hrv, yesterday())
            .unwrap()
            .unwrap();
        assert_eq!(record.status, SyncStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("scripted failure"));

        // The provider recovers; the same day is retried and succeeds
        engine.provider.failing_daily.clear();
        engine
            .provider
            .daily
            .insert(daily_key(MetricType::Hrv, yesterday()), json!({"hrvSummary": {"weeklyAvg": 50}}));

        let mut stats = SyncStats::default();
        engine
            .sync_daily_metric(MetricType::Hrv, 1, &mut stats)
            .await
            .unwrap();

        assert_eq!(stats.saved, 1);
        assert!(engine
            .store
            .is_synced(SOURCE, MetricType::Hrv, yesterday())
            .unwrap());
    }

    #[tokio::test]
    async fn test_no_data_day_left_unmarked() {
        let provider = ScriptedProvider::default();
        let mut engine = engine(provider);

        let mut stats = SyncStats::default();
        engine
            .sync_daily_metric(MetricType::Respiration, 1, &mut stats)
            .await
            .unwrap();

        assert_eq!(stats.no_data, 1);
        assert!(engine
            .store
            .get_sync_record(SOURCE, MetricType::Respiration, yesterday())
            .unwrap()
            .is_none());

        // Still eligible: the next run fetches again
        let mut stats = SyncStats::default();
        engine
            .sync_daily_metric(MetricType::Respiration, 1, &mut stats)
            .await
            .unwrap();
        assert_eq!(engine.provider.daily_calls.get(), 2);
    }

    #[tokio::test]
    async fn test_sleep_payload_without_duration_not_marked() {
        let mut provider = ScriptedProvider::default();
        provider.daily.insert(
            daily_key(MetricType::Sleep, yesterday()),
            json!({"dailySleepDTO": {"sleepTimeSeconds": null}}),
        );
        let mut engine = engine(provider);

        let mut stats = SyncStats::default();
        engine
            .sync_daily_metric(MetricType::Sleep, 1, &mut stats)
            .await
            .unwrap();

        assert_eq!(stats.no_data, 1);
        assert!(engine
            .store
            .get_sync_record(SOURCE, MetricType::Sleep, yesterday())
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_activity_dedup_skips_fetches() {
        let mut provider = ScriptedProvider::default();
        provider.activities = vec![json!({
            "activityId": 12345,
            "beginTimestamp": recent_ts(),
            "hasPolyline": true
        })];
        let mut engine = engine(provider);

        // First pass stores the activity
        let mut stats = SyncStats::default();
        engine.sync_activities(7, &mut stats).await.unwrap();
        assert_eq!(stats.saved, 1);
        assert_eq!(engine.provider.detail_calls.get(), 1);
        assert_eq!(engine.provider.track_calls.get(), 1);

        // Second pass sees the stored summary and fetches nothing
        let mut stats = SyncStats::default();
        engine.sync_activities(7, &mut stats).await.unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(engine.provider.detail_calls.get(), 1);
        assert_eq!(engine.provider.track_calls.get(), 1);
    }

    #[tokio::test]
    async fn test_pagination_stops_at_cutoff() {
        let old_ts = (Utc::now() - Duration::days(400)).timestamp_millis();
        let mut provider = ScriptedProvider::default();
        // A full first page of recent items, then an old item on page two
        for i in 0..20i64 {
            provider.activities.push(json!({
                "activityId": i,
                "beginTimestamp": recent_ts() - i
            }));
        }
        provider.activities.push(json!({
            "activityId": 999,
            "beginTimestamp": old_ts
        }));
        let mut engine = engine(provider);

        let mut stats = SyncStats::default();
        engine.sync_activities(7, &mut stats).await.unwrap();

        assert_eq!(engine.provider.list_calls.get(), 2);
        assert_eq!(stats.saved, 20);
        assert!(!engine.store.activity_exists("999").unwrap());
    }

    #[tokio::test]
    async fn test_one_bad_activity_does_not_abort_the_rest() {
        let mut provider = ScriptedProvider::default();
        provider.activities = vec![
            json!({"beginTimestamp": recent_ts()}),
            json!({"activityId": 7, "beginTimestamp": recent_ts()}),
        ];
        let mut engine = engine(provider);

        let mut stats = SyncStats::default();
        engine.sync_activities(7, &mut stats).await.unwrap();

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.saved, 1);
        assert!(engine.store.activity_exists("7").unwrap());
    }

    #[tokio::test]
    async fn test_track_points_persisted_with_summary() {
        let mut provider = ScriptedProvider::default();
        provider.activities = vec![json!({
            "activityId": 42,
            "beginTimestamp": recent_ts(),
            "hasPolyline": true
        })];
        provider.details.insert(
            "42".to_string(),
            json!({"summaryDTO": {"startTimeGMT": "2024-01-01T08:00:00.0", "duration": 1800.0}}),
        );
        provider.tracks.insert(
            "42".to_string(),
            json!({
                "metricDescriptors": [
                    {"key": "sumElapsedDuration", "metricsIndex": 0},
                    {"key": "directHeartRate", "metricsIndex": 1}
                ],
                "activityDetailMetrics": [
                    {"metrics": [0.0, 118.0]},
                    {"metrics": [120.0, 121.0]}
                ]
            }),
        );
        let mut engine = engine(provider);

        let mut stats = SyncStats::default();
        engine.sync_activities(7, &mut stats).await.unwrap();

        assert_eq!(stats.saved, 1);
        let counts = engine.store.table_counts().unwrap();
        let details = counts.iter().find(|(t, _)| *t == "activity_detail").unwrap();
        assert_eq!(details.1, 2);
    }

    #[tokio::test]
    async fn test_full_run_counts_every_metric() {
        let mut provider = ScriptedProvider::default();
        let date = yesterday();
        provider
            .daily
            .insert(daily_key(MetricType::HeartRate, date), json!({"restingHeartRate": 52}));
        provider.daily.insert(
            daily_key(MetricType::Sleep, date),
            json!({"dailySleepDTO": {"sleepTimeSeconds": 27005}}),
        );
        provider
            .daily
            .insert(daily_key(MetricType::Stress, date), json!({"avgStressLevel": 30}));
        provider
            .daily
            .insert(daily_key(MetricType::Spo2, date), json!({"averageSpO2": 95.0}));
        provider.daily.insert(
            daily_key(MetricType::Respiration, date),
            json!({"avgWakingRespirationValue": 15.0}),
        );
        provider
            .daily
            .insert(daily_key(MetricType::Hrv, date), json!({"hrvSummary": {"weeklyAvg": 48}}));

        let mut engine = engine(provider);
        let stats = engine.run(1).await.unwrap();

        assert_eq!(stats.saved, 6);
        assert_eq!(stats.failed, 0);
        for metric in MetricType::DAILY {
            assert!(engine.store.is_synced(SOURCE, metric, date).unwrap());
        }
    }

    #[test]
    fn test_stats_display() {
        let stats = SyncStats {
            saved: 4,
            skipped: 2,
            no_data: 1,
            failed: 0,
        };
        assert_eq!(stats.to_string(), "4 saved, 2 skipped, 1 without data, 0 failed");
    }
}
