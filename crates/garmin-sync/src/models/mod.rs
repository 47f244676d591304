//! Canonical records produced by the normalizer and stored by [`MetricStore`]
//!
//! Every summary keeps the raw provider payload alongside the extracted
//! columns so a day can be audited or re-derived later.
//!
//! [`MetricStore`]: crate::storage::MetricStore

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Date-keyed metric types synced per calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    HeartRate,
    Sleep,
    Stress,
    Spo2,
    Respiration,
    Hrv,
}

impl MetricType {
    /// All date-keyed metric types, in sync order
    pub const DAILY: [MetricType; 6] = [
        MetricType::HeartRate,
        MetricType::Sleep,
        MetricType::Stress,
        MetricType::Spo2,
        MetricType::Respiration,
        MetricType::Hrv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::HeartRate => "heartrate",
            MetricType::Sleep => "sleep",
            MetricType::Stress => "stress",
            MetricType::Spo2 => "spo2",
            MetricType::Respiration => "respiration",
            MetricType::Hrv => "hrv",
        }
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a per-day ingestion attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable marker for a (source, metric type, date) ingestion attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRecord {
    pub source: String,
    pub metric_type: MetricType,
    pub date: NaiveDate,
    pub status: SyncStatus,
    pub data_id: Option<String>,
    pub error: Option<String>,
}

/// Activity summary merged from the list item and the detail endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub activity_id: String,
    pub activity_name: Option<String>,
    pub activity_type: Option<String>,
    /// Provider-local start time string, preserved verbatim
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_sec: Option<f64>,
    pub distance_m: Option<f64>,
    pub calories: Option<f64>,
    pub avg_hr: Option<f64>,
    pub max_hr: Option<f64>,
    pub avg_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub avg_cadence: Option<f64>,
    pub max_cadence: Option<f64>,
    pub elevation_gain: Option<f64>,
    pub elevation_loss: Option<f64>,
    pub start_lat: Option<f64>,
    pub start_lng: Option<f64>,
    pub end_lat: Option<f64>,
    pub end_lng: Option<f64>,
    pub training_effect: Option<f64>,
    pub anaerobic_effect: Option<f64>,
    pub avg_power: Option<f64>,
    pub max_power: Option<f64>,
    pub vo2max: Option<f64>,
    pub raw: serde_json::Value,
}

/// GPS/physiological sample along an activity track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub time: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    pub heart_rate: Option<i64>,
    pub speed: Option<f64>,
    pub cadence: Option<i64>,
    pub power: Option<i64>,
    pub temperature: Option<f64>,
    pub distance: Option<f64>,
}

/// Nightly sleep summary; durations are whole minutes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepSummary {
    pub date: NaiveDate,
    pub sleep_start: Option<DateTime<Utc>>,
    pub sleep_end: Option<DateTime<Utc>>,
    pub total_sleep_min: i64,
    pub deep_sleep_min: i64,
    pub light_sleep_min: i64,
    pub rem_sleep_min: i64,
    pub awake_min: i64,
    pub sleep_score: Option<i64>,
    pub sleep_quality: Option<String>,
    pub awake_count: Option<i64>,
    pub avg_spo2: Option<f64>,
    pub lowest_spo2: Option<f64>,
    pub highest_spo2: Option<f64>,
    pub avg_respiration: Option<f64>,
    pub raw: serde_json::Value,
}

/// One sleep stage segment; segments do not overlap by construction of source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepStage {
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
    pub level: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartRateSummary {
    pub date: NaiveDate,
    pub resting_hr: Option<i64>,
    pub max_hr: Option<i64>,
    pub min_hr: Option<i64>,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSample {
    pub time: DateTime<Utc>,
    pub bpm: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressSummary {
    pub date: NaiveDate,
    pub avg_level: Option<i64>,
    pub max_level: Option<i64>,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressSample {
    pub time: DateTime<Utc>,
    pub level: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spo2Summary {
    pub date: NaiveDate,
    pub avg_spo2: Option<f64>,
    pub lowest_spo2: Option<f64>,
    pub last_seven_days_avg: Option<f64>,
    pub latest_spo2: Option<f64>,
    pub raw: serde_json::Value,
}

/// Provenance of a blood-oxygen sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spo2Source {
    Hourly,
    Continuous,
}

impl Spo2Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Spo2Source::Hourly => "hourly",
            Spo2Source::Continuous => "continuous",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spo2Sample {
    pub time: DateTime<Utc>,
    pub value: f64,
    pub source: Spo2Source,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespirationSummary {
    pub date: NaiveDate,
    pub avg_waking: Option<f64>,
    pub highest: Option<f64>,
    pub lowest: Option<f64>,
    pub avg_sleeping: Option<f64>,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespirationSample {
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// Heart-rate variability summary; baseline sub-object is flattened.
/// No detail series exists for this metric type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HrvSummary {
    pub date: NaiveDate,
    pub weekly_avg: Option<i64>,
    pub last_night_avg: Option<i64>,
    pub last_night_5min_high: Option<i64>,
    pub baseline_low_upper: Option<i64>,
    pub baseline_balanced_low: Option<i64>,
    pub baseline_balanced_upper: Option<i64>,
    pub status: Option<String>,
    pub raw: serde_json::Value,
}
