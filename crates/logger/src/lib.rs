/// MatchdayLive — Logger
/// JSONL operational event stream, one file per UTC day

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event types ───────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct ApiStatusEvent {
    pub ts:          String,
    pub event:       &'static str,   // "API_STATUS"
    pub endpoint:    String,         // "live_events" | "incidents" | "lineups"
    pub ok:          bool,
    pub status_code: Option<u16>,
    pub message:     String,
}

#[derive(Serialize, Debug)]
pub struct SyncCycleEvent {
    pub ts:             String,
    pub event:          &'static str,   // "SYNC_CYCLE"
    pub feed_items:     usize,
    pub matches_synced: usize,
    pub failed_items:   usize,
}

#[derive(Serialize, Debug)]
pub struct MatchDetailsEvent {
    pub ts:              String,
    pub event:           &'static str,   // "MATCH_DETAILS"
    pub api_match_id:    i64,
    pub events_created:  usize,
    pub lineups_created: usize,
    pub skipped:         bool,           // quota guard hit, nothing fetched
}

#[derive(Serialize, Debug)]
pub struct ReimportEvent {
    pub ts:              String,
    pub event:           &'static str,   // "REIMPORT"
    pub matches_total:   usize,
    pub matches_ok:      usize,
    pub matches_failed:  usize,
    pub events_deleted:  usize,
    pub lineups_deleted: usize,
}
