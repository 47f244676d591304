//! Sleep summary and stage segments
//!
//! Duration fields arrive as integer seconds and are stored as whole
//! minutes. A day whose DTO has no `sleepTimeSeconds` carries no sleep data
//! at all and yields `None`, so nothing is persisted and the day stays
//! eligible for retry.

use chrono::NaiveDate;
use serde_json::Value;

use crate::models::{SleepStage, SleepSummary};
use crate::normalize::{datetime_from_ms_value, int_field, parse_gmt_timestamp, str_field};

pub fn parse(date: NaiveDate, payload: &Value) -> Option<(SleepSummary, Vec<SleepStage>)> {
    let dto = payload.get("dailySleepDTO")?;
    // Null duration means the provider recorded no sleep for this day
    dto.get("sleepTimeSeconds").filter(|v| !v.is_null())?;

    let minutes = |key: &str| int_field(dto, key).unwrap_or(0) / 60;

    let scores = dto.get("sleepScores").unwrap_or(&Value::Null);
    let overall = scores.get("overall").unwrap_or(&Value::Null);

    let summary = SleepSummary {
        date,
        sleep_start: dto
            .get("sleepStartTimestampGMT")
            .and_then(datetime_from_ms_value),
        sleep_end: dto
            .get("sleepEndTimestampGMT")
            .and_then(datetime_from_ms_value),
        total_sleep_min: minutes("sleepTimeSeconds"),
        deep_sleep_min: minutes("deepSleepSeconds"),
        light_sleep_min: minutes("lightSleepSeconds"),
        rem_sleep_min: minutes("remSleepSeconds"),
        awake_min: minutes("awakeSleepSeconds"),
        sleep_score: int_field(overall, "value"),
        sleep_quality: str_field(overall, "qualifierKey"),
        awake_count: int_field(dto, "awakeCount"),
        avg_spo2: dto.get("averageSpO2Value").and_then(|v| v.as_f64()),
        lowest_spo2: dto.get("lowestSpO2Value").and_then(|v| v.as_f64()),
        highest_spo2: dto.get("highestSpO2Value").and_then(|v| v.as_f64()),
        avg_respiration: dto.get("averageRespirationValue").and_then(|v| v.as_f64()),
        raw: payload.clone(),
    };

    let stages = payload
        .get("sleepLevels")
        .and_then(|v| v.as_array())
        .map(|levels| {
            levels
                .iter()
                .filter_map(|level| {
                    let start = level
                        .get("startGMT")
                        .and_then(|v| v.as_str())
                        .and_then(parse_gmt_timestamp)?;
                    let activity_level = level.get("activityLevel").and_then(|v| v.as_f64())?;
                    Some(SleepStage {
                        start,
                        end: level
                            .get("endGMT")
                            .and_then(|v| v.as_str())
                            .and_then(parse_gmt_timestamp),
                        level: activity_level,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Some((summary, stages))
}
