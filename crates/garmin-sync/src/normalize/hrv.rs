//! Heart-rate variability summary
//!
//! The payload nests the interesting numbers under `hrvSummary` (older
//! responses put them at the top level) with a nested `baseline` object
//! that is flattened into summary columns. No detail series exists for
//! this metric type.

use chrono::NaiveDate;
use serde_json::Value;

use crate::models::HrvSummary;
use crate::normalize::{int_field, str_field};

pub fn parse(date: NaiveDate, payload: &Value) -> HrvSummary {
    let summary = payload.get("hrvSummary").unwrap_or(payload);
    let baseline = summary.get("baseline").unwrap_or(&Value::Null);

    HrvSummary {
        date,
        weekly_avg: int_field(summary, "weeklyAvg"),
        last_night_avg: int_field(summary, "lastNightAvg"),
        last_night_5min_high: int_field(summary, "lastNight5MinHigh"),
        baseline_low_upper: int_field(baseline, "lowUpper"),
        baseline_balanced_low: int_field(baseline, "balancedLow"),
        baseline_balanced_upper: int_field(baseline, "balancedUpper"),
        status: str_field(summary, "status"),
        raw: payload.clone(),
    }
}
