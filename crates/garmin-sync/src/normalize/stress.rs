//! Daily stress summary and time series
//!
//! Negative raw levels are the provider's sentinels for "no reading" and
//! "resting"; they are excluded from the sample series but never block the
//! summary.

use chrono::NaiveDate;
use serde_json::Value;

use crate::models::{StressSample, StressSummary};
use crate::normalize::{datetime_from_ms_value, int_field};

pub fn parse(date: NaiveDate, payload: &Value) -> (StressSummary, Vec<StressSample>) {
    let summary = StressSummary {
        date,
        avg_level: int_field(payload, "avgStressLevel"),
        max_level: int_field(payload, "maxStressLevel"),
        raw: payload.clone(),
    };

    // stressValuesArray: [[epoch_ms, level], ...]
    let samples = payload
        .get("stressValuesArray")
        .and_then(|v| v.as_array())
        .map(|pairs| {
            pairs
                .iter()
                .filter_map(|pair| {
                    let pair = pair.as_array()?;
                    let level = pair.get(1)?.as_f64()?;
                    if level < 0.0 {
                        return None;
                    }
                    let time = datetime_from_ms_value(pair.first()?)?;
                    Some(StressSample {
                        time,
                        level: level as i64,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    (summary, samples)
}
