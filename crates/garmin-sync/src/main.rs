use clap::{Parser, Subcommand};
use garmin_sync::cli::commands;

#[derive(Parser)]
#[command(name = "garmin-sync")]
#[command(author, version, about = "Incremental Garmin Connect wellness sync", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true, env = "GARMIN_SYNC_CONFIG")]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync the trailing lookback window once
    Sync {
        /// Days to look back (defaults to the configured initial lookback)
        #[arg(long)]
        days: Option<u32>,
        /// Database file path
        #[arg(long)]
        db: Option<String>,
    },
    /// Initial backfill, then sync daily at the configured schedule time
    Run,
    /// Show stored row counts and pending retries
    Status {
        /// Database file path
        #[arg(long)]
        db: Option<String>,
    },
}

#[tokio::main]
async fn main() -> garmin_sync::Result<()> {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sync { days, db } => commands::sync(cli.config, days, db).await,
        Commands::Run => commands::run(cli.config).await,
        Commands::Status { db } => commands::status(cli.config, db).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
