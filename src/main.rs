/// MatchdayLive — Live Sync Daemon
///
/// What it does:
///   1. Every N seconds replays the live-events feed into the store
///      (leagues, teams, matches; keyed upserts, safe to repeat)
///   2. Optionally tops up per-match details (incidents + lineups) for a
///      bounded number of matches that have none stored yet
///
/// What it does NOT do: refresh already-imported details. That is the
/// `reimport` binary's job: it deletes first, which is the only way past
/// the quota guard.
///
/// Run:
///   cargo run --bin live-sync

use anyhow::Result;
use dotenv::dotenv;
use logger::EventLogger;
use match_store::MatchStore;
use sport_client::{ApiConfig, SportApiClient};
use std::env;
use std::fs::File;
use sync_engine::SyncEngine;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("=== MatchdayLive — live sync daemon ===");

    // Single instance lock
    let lock_file_path = env::temp_dir().join("matchday_live_sync.lock");
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance of live-sync is already running! Exiting.");
            return Ok(());
        }
    };

    let poll_interval_secs = env::var("LIVE_POLL_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60);

    // each detail import costs two rate-limited API calls
    let detail_budget = env::var("DETAIL_FETCH_PER_CYCLE")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);

    let db_path = env::var("MATCH_DB_PATH").unwrap_or_else(|_| "data/matches.db".to_string());
    let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

    info!("Poll interval: {}s", poll_interval_secs);
    info!("Detail fetch budget per cycle: {}", detail_budget);
    info!("DB: {}", db_path);
    info!("Logs: {}/", log_dir);

    let client = SportApiClient::new(ApiConfig::from_env()?)?;
    let store = MatchStore::open(&db_path)?;
    let engine = SyncEngine::new(client, store, EventLogger::new(&log_dir));

    loop {
        info!("--- Live sync cycle ---");
        engine.sync_live_matches().await;

        if detail_budget > 0 {
            match engine.store().matches_missing_details(detail_budget) {
                Ok(candidates) => {
                    for m in candidates {
                        if let Err(e) = engine.fetch_match_details(m.id).await {
                            warn!("detail fetch for match {} failed: {e:#}", m.id);
                        }
                    }
                }
                Err(e) => warn!("listing matches without details failed: {e:#}"),
            }
        }

        sleep(Duration::from_secs(poll_interval_secs)).await;
    }
}
