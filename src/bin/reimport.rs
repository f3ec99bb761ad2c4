/// MatchdayLive — reimport
///
/// Deletes stored events + lineups for the given matches and fetches them
/// again from the API. This is the only path that refreshes already
/// imported per-match data: the delete empties the match, so the quota
/// guard lets the fetch through.
///
/// Usage:
///   reimport [local_match_id ...]
/// No arguments: reimport ALL stored matches.

use anyhow::{Context, Result};
use dotenv::dotenv;
use logger::EventLogger;
use match_store::MatchStore;
use sport_client::{ApiConfig, SportApiClient};
use std::env;
use sync_engine::{DetailOutcome, SyncEngine};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let match_ids: Vec<i64> = env::args()
        .skip(1)
        .map(|a| a.parse().with_context(|| format!("invalid match id '{a}'")))
        .collect::<Result<_>>()?;

    let db_path = env::var("MATCH_DB_PATH").unwrap_or_else(|_| "data/matches.db".to_string());
    let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

    let client = SportApiClient::new(ApiConfig::from_env()?)?;
    let store = MatchStore::open(&db_path)?;
    let engine = SyncEngine::new(client, store, EventLogger::new(&log_dir));

    if match_ids.is_empty() {
        println!("Reimporting ALL stored matches...");
    } else {
        println!("Reimporting {} matches...", match_ids.len());
    }

    let report = engine.reimport(&match_ids).await?;

    for m in &report.matches {
        let status = match (&m.outcome, &m.error) {
            (Some(DetailOutcome::Fetched { events_created, lineups_created }), _) => {
                format!("ok: {events_created} events, {lineups_created} lineup entries")
            }
            (Some(outcome), _) => format!("ok: {outcome:?}"),
            (None, Some(e)) => format!("FAILED: {e}"),
            (None, None) => "FAILED".to_string(),
        };
        println!(
            "match {} (api {}): deleted {} events / {} lineups — {}",
            m.local_id, m.api_id, m.events_deleted, m.lineups_deleted, status
        );
    }

    println!(
        "done: {}/{} matches reimported ({} failed)",
        report.ok,
        report.matches.len(),
        report.failed
    );
    Ok(())
}
