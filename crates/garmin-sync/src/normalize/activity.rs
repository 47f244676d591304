//! Activity summary merge and track-point derivation
//!
//! The summary merges two payload sources: the activity list item (always
//! present) and the detail endpoint's `summaryDTO` (optional). A detail
//! value wins when present and non-null; the list item is the fallback.
//!
//! Track payloads are self-describing: a descriptor list names each metric
//! key and its positional index into flat per-sample value tuples. The
//! layout is per-activity and must be re-resolved on every payload.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::error::{Result, SyncError};
use crate::models::{ActivitySummary, TrackPoint};
use crate::normalize::{datetime_from_ms, parse_gmt_timestamp, str_field};

/// Key→positional-index table for one track payload
struct DescriptorMap(HashMap<String, usize>);

impl DescriptorMap {
    fn from_payload(track: &Value) -> Self {
        let mut map = HashMap::new();
        if let Some(descriptors) = track.get("metricDescriptors").and_then(|v| v.as_array()) {
            for desc in descriptors {
                let key = desc.get("key").and_then(|v| v.as_str());
                let index = desc.get("metricsIndex").and_then(|v| v.as_u64());
                if let (Some(key), Some(index)) = (key, index) {
                    map.insert(key.to_string(), index as usize);
                }
            }
        }
        Self(map)
    }

    /// Resolve a metric key against one sample tuple
    fn get<'a>(&self, metrics: &'a [Value], key: &str) -> Option<&'a Value> {
        let index = *self.0.get(key)?;
        let value = metrics.get(index)?;
        if value.is_null() {
            None
        } else {
            Some(value)
        }
    }

    fn float(&self, metrics: &[Value], key: &str) -> Option<f64> {
        self.get(metrics, key).and_then(|v| v.as_f64())
    }

    /// Whole-number coercion; zero and null both mean "no reading"
    fn nonzero_int(&self, metrics: &[Value], key: &str) -> Option<i64> {
        self.float(metrics, key)
            .filter(|v| *v != 0.0)
            .map(|v| v as i64)
    }
}

/// Merge the list item and optional detail object into one summary.
/// `activityId` is required; everything else degrades to null.
pub fn parse_summary(list_item: &Value, detail: Option<&Value>) -> Result<ActivitySummary> {
    let dto = detail.and_then(|d| d.get("summaryDTO")).unwrap_or(&Value::Null);

    let activity_id =
        activity_id(list_item).ok_or_else(|| SyncError::invalid_response("Missing activityId"))?;

    // Detail value wins when present, list item fills the gaps
    let pick = |dto_key: &str, list_key: &str| -> Option<f64> {
        dto.get(dto_key)
            .and_then(|v| v.as_f64())
            .or_else(|| list_item.get(list_key).and_then(|v| v.as_f64()))
    };

    Ok(ActivitySummary {
        activity_id,
        activity_name: str_field(list_item, "activityName"),
        activity_type: list_item
            .get("activityType")
            .and_then(|t| t.get("typeKey"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        start_time: str_field(list_item, "startTimeLocal"),
        end_time: str_field(list_item, "endTimeGMT"),
        duration_sec: pick("duration", "duration"),
        distance_m: pick("distance", "distance"),
        calories: pick("calories", "calories"),
        avg_hr: pick("averageHR", "averageHR"),
        max_hr: pick("maxHR", "maxHR"),
        avg_speed: pick("averageSpeed", "averageSpeed"),
        max_speed: pick("maxSpeed", "maxSpeed"),
        avg_cadence: pick("averageRunCadence", "averageRunningCadenceInStepsPerMinute"),
        max_cadence: pick("maxRunCadence", "maxRunningCadenceInStepsPerMinute"),
        elevation_gain: dto.get("elevationGain").and_then(|v| v.as_f64()),
        elevation_loss: dto.get("elevationLoss").and_then(|v| v.as_f64()),
        start_lat: dto.get("startLatitude").and_then(|v| v.as_f64()),
        start_lng: dto.get("startLongitude").and_then(|v| v.as_f64()),
        end_lat: dto.get("endLatitude").and_then(|v| v.as_f64()),
        end_lng: dto.get("endLongitude").and_then(|v| v.as_f64()),
        training_effect: list_item.get("aerobicTrainingEffect").and_then(|v| v.as_f64()),
        anaerobic_effect: list_item
            .get("anaerobicTrainingEffect")
            .and_then(|v| v.as_f64()),
        avg_power: list_item.get("avgPower").and_then(|v| v.as_f64()),
        max_power: list_item.get("maxPower").and_then(|v| v.as_f64()),
        vo2max: list_item.get("vO2MaxValue").and_then(|v| v.as_f64()),
        raw: list_item.clone(),
    })
}

/// Activity ids arrive as numbers or strings depending on the endpoint
pub fn activity_id(list_item: &Value) -> Option<String> {
    match list_item.get("activityId")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Derive track points from a descriptor-indexed track payload.
///
/// Sample time comes from `directTimestamp` (epoch-ms) when present,
/// otherwise from `sumElapsedDuration` seconds added to the activity's GMT
/// start time. A tuple with neither time source is dropped.
pub fn parse_track_points(track: &Value, start_time_gmt: Option<&str>) -> Vec<TrackPoint> {
    let descriptors = DescriptorMap::from_payload(track);
    let start = start_time_gmt
        .and_then(parse_gmt_timestamp)
        .map(|dt| dt.and_utc());

    let mut points = Vec::new();
    let samples = track
        .get("activityDetailMetrics")
        .and_then(|v| v.as_array())
        .map(|v| v.as_slice())
        .unwrap_or_default();

    for sample in samples {
        let metrics = match sample.get("metrics").and_then(|v| v.as_array()) {
            Some(m) if !m.is_empty() => m.as_slice(),
            _ => continue,
        };

        let time = match resolve_sample_time(&descriptors, metrics, start) {
            Some(t) => t,
            None => continue,
        };

        points.push(TrackPoint {
            time,
            latitude: descriptors.float(metrics, "directLatitude"),
            longitude: descriptors.float(metrics, "directLongitude"),
            elevation: descriptors.float(metrics, "directElevation"),
            heart_rate: descriptors.nonzero_int(metrics, "directHeartRate"),
            speed: descriptors.float(metrics, "directSpeed"),
            cadence: descriptors.nonzero_int(metrics, "directRunCadence"),
            power: descriptors.nonzero_int(metrics, "directPower"),
            temperature: descriptors.float(metrics, "directAirTemperature"),
            distance: descriptors.float(metrics, "sumDistance"),
        });
    }

    points
}

fn resolve_sample_time(
    descriptors: &DescriptorMap,
    metrics: &[Value],
    start: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    // A zero timestamp is a placeholder, not a real instant
    if let Some(ts) = descriptors
        .float(metrics, "directTimestamp")
        .filter(|ts| *ts != 0.0)
    {
        return datetime_from_ms(ts as i64);
    }

    let elapsed = descriptors.float(metrics, "sumElapsedDuration")?;
    let start = start?;
    Some(start + Duration::milliseconds((elapsed * 1000.0) as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_detail_precedence() {
        let list_item = json!({
            "activityId": 12345,
            "activityName": "Morning Run",
            "activityType": {"typeKey": "running"},
            "startTimeLocal": "2024-01-01 08:00:00",
            "duration": 1800.0,
            "distance": 5000.0,
            "averageHR": 140.0,
            "aerobicTrainingEffect": 3.2
        });
        let detail = json!({
            "summaryDTO": {
                "duration": 1805.5,
                "averageHR": 142.0,
                "elevationGain": 55.0,
                "startLatitude": 40.0
            }
        });

        let summary = parse_summary(&list_item, Some(&detail)).unwrap();
        assert_eq!(summary.activity_id, "12345");
        assert_eq!(summary.activity_name.as_deref(), Some("Morning Run"));
        assert_eq!(summary.activity_type.as_deref(), Some("running"));
        // Detail wins where present
        assert_eq!(summary.duration_sec, Some(1805.5));
        assert_eq!(summary.avg_hr, Some(142.0));
        // List item fills the gaps
        assert_eq!(summary.distance_m, Some(5000.0));
        assert_eq!(summary.training_effect, Some(3.2));
        // Detail-only fields
        assert_eq!(summary.elevation_gain, Some(55.0));
        assert_eq!(summary.start_lat, Some(40.0));
        // Neither source
        assert_eq!(summary.vo2max, None);
    }

    #[test]
    fn test_summary_without_detail() {
        let list_item = json!({
            "activityId": "98765",
            "duration": 600.0
        });

        let summary = parse_summary(&list_item, None).unwrap();
        assert_eq!(summary.activity_id, "98765");
        assert_eq!(summary.duration_sec, Some(600.0));
        assert_eq!(summary.elevation_gain, None);
        assert_eq!(summary.raw, list_item);
    }

    #[test]
    fn test_summary_missing_id_is_error() {
        let result = parse_summary(&json!({"activityName": "x"}), None);
        assert!(result.is_err());
    }

    fn track_payload() -> Value {
        json!({
            "metricDescriptors": [
                {"key": "directTimestamp", "metricsIndex": 0},
                {"key": "directHeartRate", "metricsIndex": 1},
                {"key": "directSpeed", "metricsIndex": 2},
                {"key": "sumElapsedDuration", "metricsIndex": 3}
            ],
            "activityDetailMetrics": [
                {"metrics": [1704096000000i64, 120.0, 3.1, 0.0]},
                {"metrics": [null, 0.0, 2.8, 120.0]},
                {"metrics": [null, 130.0, null, null]}
            ]
        })
    }

    #[test]
    fn test_track_point_absolute_timestamp() {
        let points = parse_track_points(&track_payload(), Some("2024-01-01T08:00:00.0"));
        assert_eq!(points[0].time.to_rfc3339(), "2024-01-01T08:00:00+00:00");
        assert_eq!(points[0].heart_rate, Some(120));
        assert_eq!(points[0].speed, Some(3.1));
    }

    #[test]
    fn test_track_point_elapsed_fallback() {
        let points = parse_track_points(&track_payload(), Some("2024-01-01T08:00:00.0"));
        // Second tuple has no absolute timestamp, 120s elapsed from start
        assert_eq!(points[1].time.to_rfc3339(), "2024-01-01T08:02:00+00:00");
        // Zero heart rate is treated as no reading
        assert_eq!(points[1].heart_rate, None);
    }

    #[test]
    fn test_track_point_without_time_dropped() {
        let points = parse_track_points(&track_payload(), Some("2024-01-01T08:00:00.0"));
        // Third tuple has neither time source
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn test_elapsed_fallback_needs_start_time() {
        let points = parse_track_points(&track_payload(), None);
        // Only the tuple with an absolute timestamp survives
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn test_descriptor_layout_is_not_assumed() {
        // Same fields, different positions than track_payload()
        let track = json!({
            "metricDescriptors": [
                {"key": "directHeartRate", "metricsIndex": 2},
                {"key": "directTimestamp", "metricsIndex": 1},
                {"key": "directPower", "metricsIndex": 0}
            ],
            "activityDetailMetrics": [
                {"metrics": [250.0, 1704096000000i64, 145.0]}
            ]
        });

        let points = parse_track_points(&track, None);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].heart_rate, Some(145));
        assert_eq!(points[0].power, Some(250));
        // Key absent from the descriptor list resolves to null
        assert_eq!(points[0].speed, None);
    }

    #[test]
    fn test_empty_track_payload() {
        assert!(parse_track_points(&json!({}), None).is_empty());
        assert!(parse_track_points(&json!({"metricDescriptors": [], "activityDetailMetrics": []}), None).is_empty());
    }
}
