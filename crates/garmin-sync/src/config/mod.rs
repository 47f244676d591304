//! Configuration for garmin-sync
//!
//! A [`SyncConfig`] is loaded once at startup and passed by reference to the
//! components that need it. Nothing here is globally mutable.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

use crate::error::{Result, SyncError};

/// Default configuration directory name
const CONFIG_DIR_NAME: &str = "garmin-sync";

/// Config file name inside the config directory
const CONFIG_FILENAME: &str = "config.json";

/// Earliest calendar day a backfill will reach for
const EARLIEST_YEAR: i32 = 2016;
const EARLIEST_MONTH: u32 = 6;
const EARLIEST_DAY: u32 = 1;

/// Get the configuration directory path
/// Returns ~/.config/garmin-sync on Unix, ~/Library/Application Support/garmin-sync on macOS
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join(CONFIG_DIR_NAME))
        .ok_or_else(|| SyncError::config("Could not determine config directory"))
}

/// Get the data directory path for the database and session token
pub fn data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|p| p.join(CONFIG_DIR_NAME))
        .ok_or_else(|| SyncError::config("Could not determine data directory"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Earliest supported backfill date
pub fn earliest_supported_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(EARLIEST_YEAR, EARLIEST_MONTH, EARLIEST_DAY)
        .expect("valid earliest date")
}

/// Immutable runtime configuration, loaded once from a JSON file
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Account email; consumed by the external login flow, not by the sync itself
    #[serde(default)]
    pub email: Option<String>,

    /// Account password; consumed by the external login flow
    #[serde(default)]
    pub password: Option<String>,

    /// Provider regional domain (e.g. "garmin.com", "garmin.cn")
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Where the resumable session token lives; defaults under the data dir
    #[serde(default)]
    pub session_path: Option<PathBuf>,

    /// SQLite database path; defaults under the data dir
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Lookback window for the first run; unset means back to the earliest
    /// supported date
    #[serde(default)]
    pub init_days: Option<u32>,

    /// Daily schedule time, HH:MM local
    #[serde(default = "default_schedule")]
    pub schedule: String,
}

fn default_domain() -> String {
    "garmin.com".to_string()
}

fn default_schedule() -> String {
    "08:00".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            email: None,
            password: None,
            domain: default_domain(),
            session_path: None,
            db_path: None,
            init_days: None,
            schedule: default_schedule(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            SyncError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: SyncConfig = serde_json::from_str(&json)
            .map_err(|e| SyncError::config(format!("Invalid config file: {}", e)))?;
        Ok(config)
    }

    /// Load from the default location, falling back to defaults when the
    /// file does not exist
    pub fn load_default() -> Result<Self> {
        let path = config_dir()?.join(CONFIG_FILENAME);
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolved session token path
    pub fn session_file(&self) -> Result<PathBuf> {
        match &self.session_path {
            Some(p) => Ok(p.clone()),
            None => Ok(data_dir()?.join("session.json")),
        }
    }

    /// Resolved database path
    pub fn database_file(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(p) => Ok(p.clone()),
            None => Ok(data_dir()?.join("garmin.db")),
        }
    }

    /// Lookback window for the first run: configured `init_days`, or the
    /// span back to the earliest supported date
    pub fn initial_lookback_days(&self, today: NaiveDate) -> u32 {
        match self.init_days {
            Some(days) => days,
            None => {
                let span = today - earliest_supported_date();
                span.num_days().max(1) as u32
            }
        }
    }

    /// Parse the daily schedule time
    pub fn schedule_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.schedule, "%H:%M")
            .map_err(|_| SyncError::config(format!("Invalid schedule time: {}", self.schedule)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "email": "user@example.com",
                "password": "secret",
                "domain": "garmin.cn",
                "init_days": 30,
                "schedule": "07:30"
            }"#,
        )
        .unwrap();

        let config = SyncConfig::load(&path).unwrap();
        assert_eq!(config.email.as_deref(), Some("user@example.com"));
        assert_eq!(config.domain, "garmin.cn");
        assert_eq!(config.init_days, Some(30));
        assert_eq!(
            config.schedule_time().unwrap(),
            NaiveTime::from_hms_opt(7, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.domain, "garmin.com");
        assert_eq!(config.schedule, "08:00");
        assert!(config.init_days.is_none());
    }

    #[test]
    fn test_initial_lookback_uses_init_days() {
        let config = SyncConfig {
            init_days: Some(14),
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(config.initial_lookback_days(today), 14);
    }

    #[test]
    fn test_initial_lookback_reaches_earliest_date() {
        let config = SyncConfig::default();
        let today = NaiveDate::from_ymd_opt(2016, 6, 11).unwrap();
        assert_eq!(config.initial_lookback_days(today), 10);
    }

    #[test]
    fn test_invalid_schedule_rejected() {
        let config = SyncConfig {
            schedule: "25:99".to_string(),
            ..Default::default()
        };
        assert!(config.schedule_time().is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let result = SyncConfig::load(temp.path().join("nope.json"));
        assert!(matches!(result, Err(SyncError::Config(_))));
    }
}
