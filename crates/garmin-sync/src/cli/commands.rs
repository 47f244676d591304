//! CLI commands for garmin-sync

use std::path::PathBuf;

use chrono::{Duration, Local, NaiveDateTime, NaiveTime, Utc};

use crate::client::{ConnectClient, SessionStore};
use crate::config::SyncConfig;
use crate::error::Result;
use crate::storage::MetricStore;
use crate::sync::SyncEngine;

fn load_config(path: Option<String>) -> Result<SyncConfig> {
    match path {
        Some(p) => SyncConfig::load(p),
        None => SyncConfig::load_default(),
    }
}

/// Resume the session, open the store, and assemble an engine for one run
async fn build_engine(
    config: &SyncConfig,
    db_override: Option<String>,
) -> Result<SyncEngine<ConnectClient>> {
    let session = SessionStore::new(config.session_file()?);
    let token = session.resume()?;

    let mut client = ConnectClient::new(&config.domain, token);
    let display_name = client.resolve_display_name().await?;
    println!("Signed in as {}", display_name);

    let db_path = match db_override {
        Some(p) => PathBuf::from(p),
        None => config.database_file()?,
    };
    if let Some(parent) = db_path.parent() {
        crate::config::ensure_dir(parent)?;
    }
    println!("Using database: {}", db_path.display());
    let store = MetricStore::open(&db_path)?;

    Ok(SyncEngine::new(client, store))
}

/// One-shot sync over the trailing lookback window
pub async fn sync(
    config_path: Option<String>,
    days: Option<u32>,
    db: Option<String>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let today = Utc::now().date_naive();
    let lookback = days.unwrap_or_else(|| config.initial_lookback_days(today));

    let mut engine = build_engine(&config, db).await?;
    let stats = engine.run(lookback).await?;
    println!("\nSync complete: {}", stats);
    Ok(())
}

/// Initial backfill, then a daily run at the configured schedule time
pub async fn run(config_path: Option<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let schedule = config.schedule_time()?;

    let today = Utc::now().date_naive();
    let lookback = config.initial_lookback_days(today);
    println!("Initial sync: looking back {} days", lookback);
    run_once(&config, lookback).await;

    loop {
        let wait = time_until_next(Local::now().naive_local(), schedule);
        println!(
            "Next sync at {} (in {} minutes)",
            schedule.format("%H:%M"),
            wait.as_secs() / 60
        );
        tokio::time::sleep(wait).await;
        run_once(&config, 1).await;
    }
}

/// One engine per invocation: session and store are opened fresh and
/// released when the run ends. A failed run is reported and the schedule
/// carries on; the next invocation retries independently.
async fn run_once(config: &SyncConfig, lookback: u32) {
    match build_engine(config, None).await {
        Ok(mut engine) => match engine.run(lookback).await {
            Ok(stats) => println!("\nSync complete: {}", stats),
            Err(e) => eprintln!("Sync failed: {}", e),
        },
        Err(e) => eprintln!("Sync failed: {}", e),
    }
}

/// Wall-clock wait until the next occurrence of the schedule time
fn time_until_next(now: NaiveDateTime, at: NaiveTime) -> std::time::Duration {
    let today_at = now.date().and_time(at);
    let next = if now < today_at {
        today_at
    } else {
        today_at + Duration::days(1)
    };
    (next - now).to_std().unwrap_or_default()
}

/// Show stored row counts and pending retries
pub async fn status(config_path: Option<String>, db: Option<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let db_path = match db {
        Some(p) => PathBuf::from(p),
        None => config.database_file()?,
    };

    if !db_path.exists() {
        println!("No database found at: {}", db_path.display());
        println!("Run 'garmin-sync sync' to create one.");
        return Ok(());
    }

    let store = MetricStore::open(&db_path)?;
    println!("Database: {}", db_path.display());
    println!();
    println!("Data stored:");
    for (table, count) in store.table_counts()? {
        println!("  {:<20} {:>8}", table, count);
    }

    let failed = store.failed_sync_count()?;
    if failed > 0 {
        println!();
        println!("Days pending retry: {}", failed);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_time_until_next_later_today() {
        let now = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        let at = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        assert_eq!(time_until_next(now, at).as_secs(), 2 * 3600);
    }

    #[test]
    fn test_time_until_next_rolls_to_tomorrow() {
        let now = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let at = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        assert_eq!(time_until_next(now, at).as_secs(), 22 * 3600 + 1800);
    }
}
