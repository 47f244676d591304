//! Daily heart-rate summary and time series

use chrono::NaiveDate;
use serde_json::Value;

use crate::models::{HeartRateSample, HeartRateSummary};
use crate::normalize::{datetime_from_ms_value, int_field};

pub fn parse(date: NaiveDate, payload: &Value) -> (HeartRateSummary, Vec<HeartRateSample>) {
    let summary = HeartRateSummary {
        date,
        resting_hr: int_field(payload, "restingHeartRate"),
        max_hr: int_field(payload, "maxHeartRate"),
        min_hr: int_field(payload, "minHeartRate"),
        raw: payload.clone(),
    };

    // heartRateValues: [[epoch_ms, bpm], ...]; null readings are skipped
    let samples = payload
        .get("heartRateValues")
        .and_then(|v| v.as_array())
        .map(|pairs| {
            pairs
                .iter()
                .filter_map(|pair| {
                    let pair = pair.as_array()?;
                    let time = datetime_from_ms_value(pair.first()?)?;
                    let bpm = pair.get(1)?.as_f64()?;
                    Some(HeartRateSample {
                        time,
                        bpm: bpm as i64,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    (summary, samples)
}
