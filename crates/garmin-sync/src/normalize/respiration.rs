//! Daily respiration summary and time series

use chrono::NaiveDate;
use serde_json::Value;

use crate::models::{RespirationSample, RespirationSummary};
use crate::normalize::datetime_from_ms_value;

pub fn parse(date: NaiveDate, payload: &Value) -> (RespirationSummary, Vec<RespirationSample>) {
    let summary = RespirationSummary {
        date,
        avg_waking: payload
            .get("avgWakingRespirationValue")
            .and_then(|v| v.as_f64()),
        highest: payload
            .get("highestRespirationValue")
            .and_then(|v| v.as_f64()),
        lowest: payload
            .get("lowestRespirationValue")
            .and_then(|v| v.as_f64()),
        avg_sleeping: payload
            .get("avgSleepRespirationValue")
            .and_then(|v| v.as_f64()),
        raw: payload.clone(),
    };

    // respirationValuesArray: [[epoch_ms, breaths_per_min], ...]
    let samples = payload
        .get("respirationValuesArray")
        .and_then(|v| v.as_array())
        .map(|pairs| {
            pairs
                .iter()
                .filter_map(|pair| {
                    let pair = pair.as_array()?;
                    let value = pair.get(1)?.as_f64()?;
                    let time = datetime_from_ms_value(pair.first()?)?;
                    Some(RespirationSample { time, value })
                })
                .collect()
        })
        .unwrap_or_default();

    (summary, samples)
}
