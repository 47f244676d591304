//! SQLite-backed metric store
//!
//! Conflict resolution is the store's contract: summary upserts refresh only
//! the mutable column subset (plus the raw payload), detail inserts are
//! first-write-wins on (parent key, sample time). Each write call is one
//! transaction: a summary and its detail rows commit together or not at
//! all.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::error::{Result, SyncError};
use crate::models::{
    ActivitySummary, HeartRateSample, HeartRateSummary, HrvSummary, MetricType,
    RespirationSample, RespirationSummary, SleepStage, SleepSummary, Spo2Sample, Spo2Summary,
    StressSample, StressSummary, SyncRecord, SyncStatus, TrackPoint,
};
use crate::storage::schema::SCHEMA;

/// Detail rows per insert statement
const DETAIL_BATCH_SIZE: usize = 500;

/// Summary and detail tables, in display order
pub const TABLES: [&str; 13] = [
    "activity",
    "activity_detail",
    "sleep",
    "sleep_detail",
    "heart_rate",
    "heart_rate_detail",
    "stress",
    "stress_detail",
    "spo2",
    "spo2_detail",
    "respiration",
    "respiration_detail",
    "hrv",
];

/// SQLite database holding all synced metrics plus the sync records
pub struct MetricStore {
    conn: Connection,
}

impl MetricStore {
    /// Open or create the store
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| SyncError::database(format!("Failed to open database: {}", e)))?;

        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SyncError::database(format!("Failed to open in-memory database: {}", e)))?;

        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Run migrations
    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA)
            .map_err(|e| SyncError::database(format!("Failed to run migrations: {}", e)))?;
        Ok(())
    }

    // =========================================================================
    // Activities
    // =========================================================================

    /// Check if an activity summary is already stored; this is the dedup
    /// gate for activity ingestion
    pub fn activity_exists(&self, activity_id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM activity WHERE activity_id = ?1",
                params![activity_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Persist an activity summary and its track points in one transaction
    pub fn write_activity(
        &mut self,
        summary: &ActivitySummary,
        points: &[TrackPoint],
    ) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO activity
                (activity_id, activity_name, activity_type, start_time, end_time,
                 duration_sec, distance_m, calories, avg_hr, max_hr, avg_speed, max_speed,
                 avg_cadence, max_cadence, elevation_gain, elevation_loss,
                 start_lat, start_lng, end_lat, end_lng,
                 training_effect, anaerobic_effect, avg_power, max_power, vo2max, raw_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                     ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26)
             ON CONFLICT (activity_id) DO UPDATE SET
                 activity_name = excluded.activity_name,
                 duration_sec = excluded.duration_sec,
                 distance_m = excluded.distance_m,
                 calories = excluded.calories,
                 avg_hr = excluded.avg_hr,
                 max_hr = excluded.max_hr,
                 avg_speed = excluded.avg_speed,
                 max_speed = excluded.max_speed,
                 raw_json = excluded.raw_json",
            params![
                summary.activity_id,
                summary.activity_name,
                summary.activity_type,
                summary.start_time,
                summary.end_time,
                summary.duration_sec,
                summary.distance_m,
                summary.calories,
                summary.avg_hr,
                summary.max_hr,
                summary.avg_speed,
                summary.max_speed,
                summary.avg_cadence,
                summary.max_cadence,
                summary.elevation_gain,
                summary.elevation_loss,
                summary.start_lat,
                summary.start_lng,
                summary.end_lat,
                summary.end_lng,
                summary.training_effect,
                summary.anaerobic_effect,
                summary.avg_power,
                summary.max_power,
                summary.vo2max,
                summary.raw.to_string(),
            ],
        )?;

        let rows: Vec<Vec<SqlValue>> = points
            .iter()
            .map(|p| {
                vec![
                    SqlValue::from(summary.activity_id.clone()),
                    SqlValue::from(encode_dt(&p.time)),
                    SqlValue::from(p.latitude),
                    SqlValue::from(p.longitude),
                    SqlValue::from(p.elevation),
                    SqlValue::from(p.heart_rate),
                    SqlValue::from(p.speed),
                    SqlValue::from(p.cadence),
                    SqlValue::from(p.power),
                    SqlValue::from(p.temperature),
                    SqlValue::from(p.distance),
                ]
            })
            .collect();

        batch_insert(
            &tx,
            "INSERT INTO activity_detail
                (activity_id, point_time, latitude, longitude, elevation,
                 heart_rate, speed, cadence, power, temperature, distance)
             VALUES ",
            " ON CONFLICT (activity_id, point_time) DO NOTHING",
            11,
            &rows,
        )?;

        tx.commit()?;
        Ok(())
    }

    // =========================================================================
    // Daily metrics
    // =========================================================================

    pub fn write_sleep_day(
        &mut self,
        summary: &SleepSummary,
        stages: &[SleepStage],
    ) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO sleep
                (sleep_date, sleep_start, sleep_end, total_sleep_min, deep_sleep_min,
                 light_sleep_min, rem_sleep_min, awake_min, sleep_score, sleep_quality,
                 awake_count, avg_spo2, lowest_spo2, highest_spo2, avg_respiration, raw_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
             ON CONFLICT (sleep_date) DO UPDATE SET
                 sleep_start = excluded.sleep_start,
                 sleep_end = excluded.sleep_end,
                 total_sleep_min = excluded.total_sleep_min,
                 deep_sleep_min = excluded.deep_sleep_min,
                 light_sleep_min = excluded.light_sleep_min,
                 rem_sleep_min = excluded.rem_sleep_min,
                 awake_min = excluded.awake_min,
                 sleep_score = excluded.sleep_score,
                 raw_json = excluded.raw_json",
            params![
                encode_date(summary.date),
                summary.sleep_start.as_ref().map(encode_dt),
                summary.sleep_end.as_ref().map(encode_dt),
                summary.total_sleep_min,
                summary.deep_sleep_min,
                summary.light_sleep_min,
                summary.rem_sleep_min,
                summary.awake_min,
                summary.sleep_score,
                summary.sleep_quality,
                summary.awake_count,
                summary.avg_spo2,
                summary.lowest_spo2,
                summary.highest_spo2,
                summary.avg_respiration,
                summary.raw.to_string(),
            ],
        )?;

        let rows: Vec<Vec<SqlValue>> = stages
            .iter()
            .map(|s| {
                vec![
                    SqlValue::from(encode_date(summary.date)),
                    SqlValue::from(encode_naive(&s.start)),
                    SqlValue::from(s.end.as_ref().map(encode_naive)),
                    SqlValue::from(s.level),
                ]
            })
            .collect();

        batch_insert(
            &tx,
            "INSERT INTO sleep_detail (sleep_date, start_time, end_time, activity_level) VALUES ",
            " ON CONFLICT (sleep_date, start_time) DO NOTHING",
            4,
            &rows,
        )?;

        tx.commit()?;
        Ok(())
    }

    pub fn write_heart_rate_day(
        &mut self,
        summary: &HeartRateSummary,
        samples: &[HeartRateSample],
    ) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO heart_rate (hr_date, resting_hr, max_hr, min_hr, raw_json)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (hr_date) DO UPDATE SET
                 resting_hr = excluded.resting_hr,
                 max_hr = excluded.max_hr,
                 min_hr = excluded.min_hr,
                 raw_json = excluded.raw_json",
            params![
                encode_date(summary.date),
                summary.resting_hr,
                summary.max_hr,
                summary.min_hr,
                summary.raw.to_string(),
            ],
        )?;

        let rows: Vec<Vec<SqlValue>> = samples
            .iter()
            .map(|s| {
                vec![
                    SqlValue::from(encode_date(summary.date)),
                    SqlValue::from(encode_dt(&s.time)),
                    SqlValue::from(s.bpm),
                ]
            })
            .collect();

        batch_insert(
            &tx,
            "INSERT INTO heart_rate_detail (hr_date, point_time, heart_rate) VALUES ",
            " ON CONFLICT (hr_date, point_time) DO NOTHING",
            3,
            &rows,
        )?;

        tx.commit()?;
        Ok(())
    }

    pub fn write_stress_day(
        &mut self,
        summary: &StressSummary,
        samples: &[StressSample],
    ) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO stress (stress_date, avg_level, max_level, raw_json)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (stress_date) DO UPDATE SET
                 avg_level = excluded.avg_level,
                 raw_json = excluded.raw_json",
            params![
                encode_date(summary.date),
                summary.avg_level,
                summary.max_level,
                summary.raw.to_string(),
            ],
        )?;

        let rows: Vec<Vec<SqlValue>> = samples
            .iter()
            .map(|s| {
                vec![
                    SqlValue::from(encode_date(summary.date)),
                    SqlValue::from(encode_dt(&s.time)),
                    SqlValue::from(s.level),
                ]
            })
            .collect();

        batch_insert(
            &tx,
            "INSERT INTO stress_detail (stress_date, point_time, stress_level) VALUES ",
            " ON CONFLICT (stress_date, point_time) DO NOTHING",
            3,
            &rows,
        )?;

        tx.commit()?;
        Ok(())
    }

    pub fn write_spo2_day(&mut self, summary: &Spo2Summary, samples: &[Spo2Sample]) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO spo2 (spo2_date, avg_spo2, lowest_spo2, last_seven_days_avg, latest_spo2, raw_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (spo2_date) DO UPDATE SET
                 avg_spo2 = excluded.avg_spo2,
                 lowest_spo2 = excluded.lowest_spo2,
                 raw_json = excluded.raw_json",
            params![
                encode_date(summary.date),
                summary.avg_spo2,
                summary.lowest_spo2,
                summary.last_seven_days_avg,
                summary.latest_spo2,
                summary.raw.to_string(),
            ],
        )?;

        let rows: Vec<Vec<SqlValue>> = samples
            .iter()
            .map(|s| {
                vec![
                    SqlValue::from(encode_date(summary.date)),
                    SqlValue::from(encode_dt(&s.time)),
                    SqlValue::from(s.value),
                    SqlValue::from(s.source.as_str().to_string()),
                ]
            })
            .collect();

        batch_insert(
            &tx,
            "INSERT INTO spo2_detail (spo2_date, point_time, spo2_value, reading_source) VALUES ",
            " ON CONFLICT (spo2_date, point_time) DO NOTHING",
            4,
            &rows,
        )?;

        tx.commit()?;
        Ok(())
    }

    pub fn write_respiration_day(
        &mut self,
        summary: &RespirationSummary,
        samples: &[RespirationSample],
    ) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO respiration (resp_date, avg_waking, highest, lowest, avg_sleeping, raw_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (resp_date) DO UPDATE SET
                 avg_waking = excluded.avg_waking,
                 avg_sleeping = excluded.avg_sleeping,
                 raw_json = excluded.raw_json",
            params![
                encode_date(summary.date),
                summary.avg_waking,
                summary.highest,
                summary.lowest,
                summary.avg_sleeping,
                summary.raw.to_string(),
            ],
        )?;

        let rows: Vec<Vec<SqlValue>> = samples
            .iter()
            .map(|s| {
                vec![
                    SqlValue::from(encode_date(summary.date)),
                    SqlValue::from(encode_dt(&s.time)),
                    SqlValue::from(s.value),
                ]
            })
            .collect();

        batch_insert(
            &tx,
            "INSERT INTO respiration_detail (resp_date, point_time, resp_value) VALUES ",
            " ON CONFLICT (resp_date, point_time) DO NOTHING",
            3,
            &rows,
        )?;

        tx.commit()?;
        Ok(())
    }

    pub fn write_hrv_day(&mut self, summary: &HrvSummary) -> Result<()> {
        self.conn.execute(
            "INSERT INTO hrv
                (hrv_date, weekly_avg, last_night_avg, last_night_5min_high,
                 baseline_low_upper, baseline_balanced_low, baseline_balanced_upper,
                 hrv_status, raw_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT (hrv_date) DO UPDATE SET
                 weekly_avg = excluded.weekly_avg,
                 last_night_avg = excluded.last_night_avg,
                 raw_json = excluded.raw_json",
            params![
                encode_date(summary.date),
                summary.weekly_avg,
                summary.last_night_avg,
                summary.last_night_5min_high,
                summary.baseline_low_upper,
                summary.baseline_balanced_low,
                summary.baseline_balanced_upper,
                summary.status,
                summary.raw.to_string(),
            ],
        )?;
        Ok(())
    }

    // =========================================================================
    // Sync records
    // =========================================================================

    /// True only when a success record exists for the key; this is the sole
    /// gate consulted before fetching a date-keyed metric
    pub fn is_synced(&self, source: &str, metric: MetricType, date: NaiveDate) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM sync_record
                 WHERE source = ?1 AND metric_type = ?2 AND metric_date = ?3
                   AND status = 'success'",
                params![source, metric.as_str(), encode_date(date)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Record the outcome of a per-day ingestion attempt, replacing any
    /// previous outcome for the same key
    pub fn mark_synced(
        &self,
        source: &str,
        metric: MetricType,
        date: NaiveDate,
        status: SyncStatus,
        data_id: Option<&str>,
        error: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_record (source, metric_type, metric_date, status, data_id, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (source, metric_type, metric_date) DO UPDATE SET
                 status = excluded.status,
                 data_id = excluded.data_id,
                 error = excluded.error",
            params![
                source,
                metric.as_str(),
                encode_date(date),
                status.as_str(),
                data_id,
                error,
            ],
        )?;
        Ok(())
    }

    /// Fetch a sync record, if one exists
    pub fn get_sync_record(
        &self,
        source: &str,
        metric: MetricType,
        date: NaiveDate,
    ) -> Result<Option<SyncRecord>> {
        self.conn
            .query_row(
                "SELECT status, data_id, error FROM sync_record
                 WHERE source = ?1 AND metric_type = ?2 AND metric_date = ?3",
                params![source, metric.as_str(), encode_date(date)],
                |row| {
                    let status: String = row.get(0)?;
                    Ok(SyncRecord {
                        source: source.to_string(),
                        metric_type: metric,
                        date,
                        status: if status == "success" {
                            SyncStatus::Success
                        } else {
                            SyncStatus::Failed
                        },
                        data_id: row.get(1)?,
                        error: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|e| SyncError::database(format!("Failed to get sync record: {}", e)))
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Row counts for every data table
    pub fn table_counts(&self) -> Result<Vec<(&'static str, i64)>> {
        let mut counts = Vec::with_capacity(TABLES.len());
        for table in TABLES {
            let count: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
            counts.push((table, count));
        }
        Ok(counts)
    }

    /// Number of sync records currently in the failed state
    pub fn failed_sync_count(&self) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM sync_record WHERE status = 'failed'",
                [],
                |row| row.get(0),
            )
            .map_err(|e| SyncError::database(format!("Failed to count sync records: {}", e)))
    }
}

/// Insert detail rows in bounded multi-row statements
fn batch_insert(
    tx: &Transaction<'_>,
    insert_head: &str,
    conflict_tail: &str,
    row_width: usize,
    rows: &[Vec<SqlValue>],
) -> Result<()> {
    let row_placeholder = format!("({})", vec!["?"; row_width].join(", "));

    for chunk in rows.chunks(DETAIL_BATCH_SIZE) {
        let placeholders = vec![row_placeholder.as_str(); chunk.len()].join(", ");
        let sql = format!("{}{}{}", insert_head, placeholders, conflict_tail);
        tx.execute(&sql, rusqlite::params_from_iter(chunk.iter().flatten()))?;
    }

    Ok(())
}

fn encode_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn encode_dt(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn encode_naive(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}
