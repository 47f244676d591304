//! SQLite schema
//!
//! Every summary table is keyed by its natural key (activity id or date);
//! every detail table is keyed by (parent key, sample time). Raw payloads
//! are stored as JSON text alongside the extracted columns.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS activity (
    activity_id TEXT PRIMARY KEY,
    activity_name TEXT,
    activity_type TEXT,
    start_time TEXT,
    end_time TEXT,
    duration_sec REAL,
    distance_m REAL,
    calories REAL,
    avg_hr REAL,
    max_hr REAL,
    avg_speed REAL,
    max_speed REAL,
    avg_cadence REAL,
    max_cadence REAL,
    elevation_gain REAL,
    elevation_loss REAL,
    start_lat REAL,
    start_lng REAL,
    end_lat REAL,
    end_lng REAL,
    training_effect REAL,
    anaerobic_effect REAL,
    avg_power REAL,
    max_power REAL,
    vo2max REAL,
    raw_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS activity_detail (
    activity_id TEXT NOT NULL,
    point_time TEXT NOT NULL,
    latitude REAL,
    longitude REAL,
    elevation REAL,
    heart_rate INTEGER,
    speed REAL,
    cadence INTEGER,
    power INTEGER,
    temperature REAL,
    distance REAL,
    PRIMARY KEY (activity_id, point_time)
);

CREATE TABLE IF NOT EXISTS sleep (
    sleep_date TEXT PRIMARY KEY,
    sleep_start TEXT,
    sleep_end TEXT,
    total_sleep_min INTEGER NOT NULL,
    deep_sleep_min INTEGER NOT NULL,
    light_sleep_min INTEGER NOT NULL,
    rem_sleep_min INTEGER NOT NULL,
    awake_min INTEGER NOT NULL,
    sleep_score INTEGER,
    sleep_quality TEXT,
    awake_count INTEGER,
    avg_spo2 REAL,
    lowest_spo2 REAL,
    highest_spo2 REAL,
    avg_respiration REAL,
    raw_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sleep_detail (
    sleep_date TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT,
    activity_level REAL NOT NULL,
    PRIMARY KEY (sleep_date, start_time)
);

CREATE TABLE IF NOT EXISTS heart_rate (
    hr_date TEXT PRIMARY KEY,
    resting_hr INTEGER,
    max_hr INTEGER,
    min_hr INTEGER,
    raw_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS heart_rate_detail (
    hr_date TEXT NOT NULL,
    point_time TEXT NOT NULL,
    heart_rate INTEGER NOT NULL,
    PRIMARY KEY (hr_date, point_time)
);

CREATE TABLE IF NOT EXISTS stress (
    stress_date TEXT PRIMARY KEY,
    avg_level INTEGER,
    max_level INTEGER,
    raw_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS stress_detail (
    stress_date TEXT NOT NULL,
    point_time TEXT NOT NULL,
    stress_level INTEGER NOT NULL,
    PRIMARY KEY (stress_date, point_time)
);

CREATE TABLE IF NOT EXISTS spo2 (
    spo2_date TEXT PRIMARY KEY,
    avg_spo2 REAL,
    lowest_spo2 REAL,
    last_seven_days_avg REAL,
    latest_spo2 REAL,
    raw_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS spo2_detail (
    spo2_date TEXT NOT NULL,
    point_time TEXT NOT NULL,
    spo2_value REAL NOT NULL,
    reading_source TEXT NOT NULL,
    PRIMARY KEY (spo2_date, point_time)
);

CREATE TABLE IF NOT EXISTS respiration (
    resp_date TEXT PRIMARY KEY,
    avg_waking REAL,
    highest REAL,
    lowest REAL,
    avg_sleeping REAL,
    raw_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS respiration_detail (
    resp_date TEXT NOT NULL,
    point_time TEXT NOT NULL,
    resp_value REAL NOT NULL,
    PRIMARY KEY (resp_date, point_time)
);

CREATE TABLE IF NOT EXISTS hrv (
    hrv_date TEXT PRIMARY KEY,
    weekly_avg INTEGER,
    last_night_avg INTEGER,
    last_night_5min_high INTEGER,
    baseline_low_upper INTEGER,
    baseline_balanced_low INTEGER,
    baseline_balanced_upper INTEGER,
    hrv_status TEXT,
    raw_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sync_record (
    source TEXT NOT NULL,
    metric_type TEXT NOT NULL,
    metric_date TEXT NOT NULL,
    status TEXT NOT NULL,
    data_id TEXT,
    error TEXT,
    PRIMARY KEY (source, metric_type, metric_date)
);
"#;
