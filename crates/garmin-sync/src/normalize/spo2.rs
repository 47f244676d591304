//! Daily blood-oxygen summary and merged sample series
//!
//! Samples come from two independently-shaped sources: hourly averages as
//! `[epoch_ms, value]` pairs and continuous readings as objects whose
//! timestamp may be an epoch number or a datetime string. Both normalize to
//! the same sample shape, tagged with provenance; deduplication of a time
//! appearing in both sources is the store's first-write-wins insert.

use chrono::NaiveDate;
use serde_json::Value;

use crate::models::{Spo2Sample, Spo2Source, Spo2Summary};
use crate::normalize::{datetime_from_ms_value, parse_gmt_timestamp};

pub fn parse(date: NaiveDate, payload: &Value) -> (Spo2Summary, Vec<Spo2Sample>) {
    let summary = Spo2Summary {
        date,
        avg_spo2: payload.get("averageSpO2").and_then(|v| v.as_f64()),
        lowest_spo2: payload.get("lowestSpO2").and_then(|v| v.as_f64()),
        last_seven_days_avg: payload.get("lastSevenDaysAvgSpO2").and_then(|v| v.as_f64()),
        latest_spo2: payload.get("latestSpO2").and_then(|v| v.as_f64()),
        raw: payload.clone(),
    };

    let mut samples = Vec::new();

    // spO2HourlyAverages: [[epoch_ms, value], ...]
    if let Some(hourly) = payload.get("spO2HourlyAverages").and_then(|v| v.as_array()) {
        for pair in hourly {
            let Some(pair) = pair.as_array() else { continue };
            let Some(value) = pair.get(1).and_then(|v| v.as_f64()) else {
                continue;
            };
            let Some(time) = pair.first().and_then(datetime_from_ms_value) else {
                continue;
            };
            samples.push(Spo2Sample {
                time,
                value,
                source: Spo2Source::Hourly,
            });
        }
    }

    // continuousReadingDTOList: [{spo2, readingTimeGMT, ...}, ...]
    if let Some(continuous) = payload
        .get("continuousReadingDTOList")
        .and_then(|v| v.as_array())
    {
        for reading in continuous {
            let Some(value) = reading
                .get("spo2")
                .and_then(|v| v.as_f64())
                .filter(|v| *v != 0.0)
            else {
                continue;
            };
            let Some(time) = reading.get("readingTimeGMT").and_then(reading_time) else {
                continue;
            };
            samples.push(Spo2Sample {
                time,
                value,
                source: Spo2Source::Continuous,
            });
        }
    }

    (summary, samples)
}

/// Continuous readings carry either an epoch-ms number or a datetime string
fn reading_time(value: &Value) -> Option<chrono::DateTime<chrono::Utc>> {
    match value {
        Value::Number(_) => datetime_from_ms_value(value),
        Value::String(s) => parse_gmt_timestamp(s).map(|dt| dt.and_utc()),
        _ => None,
    }
}
