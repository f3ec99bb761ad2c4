//! MatchdayLive — sync engine
//!
//! Drives one direction of data flow: remote feed → mapper → store.
//! Two granularities:
//!   - live cycle: the coarse live-events list, replayed every interval;
//!     leagues/teams/matches are reconciled by upstream id, so running it
//!     twice against the same feed output changes nothing.
//!   - match details: incidents + lineups, fetched once per match and
//!     guarded by an existence check. Two extra API calls per match is real
//!     quota, so a match that already has rows is never refetched.
//!
//! The reimport path is the only way around the guard: it deletes first.
//!
//! Fetching and payload application are split so the reconciliation logic
//! is testable without HTTP.

use anyhow::{Context, Result};
use incident_mapper::map_incident;
use logger::{now_iso, EventLogger, MatchDetailsEvent, ReimportEvent, SyncCycleEvent};
use match_store::{MatchStore, MatchUpsert, NewLineupEntry, NewMissingPlayer, UNKNOWN_PLAYER};
use serde_json::Value;
use sport_client::SportApiClient;
use tracing::{info, warn};

pub struct SyncEngine {
    client: SportApiClient,
    store: MatchStore,
    events: EventLogger,
}

/// One live-sync cycle, summarized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub feed_items: usize,
    pub synced: usize,
    pub failed: usize,
}

/// Result of a per-match detail import.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailOutcome {
    /// No such match locally: a clean failure, not an error.
    NotFound,
    /// Quota guard: details already stored, no remote call made.
    AlreadyImported,
    Fetched { events_created: usize, lineups_created: usize },
}

#[derive(Debug, Clone)]
pub struct ReimportMatchOutcome {
    pub local_id: i64,
    pub api_id: i64,
    pub events_deleted: usize,
    pub lineups_deleted: usize,
    pub outcome: Option<DetailOutcome>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReimportReport {
    pub matches: Vec<ReimportMatchOutcome>,
    pub ok: usize,
    pub failed: usize,
    pub events_deleted: usize,
    pub lineups_deleted: usize,
}

impl SyncEngine {
    pub fn new(client: SportApiClient, store: MatchStore, events: EventLogger) -> Self {
        Self { client, store, events }
    }

    pub fn store(&self) -> &MatchStore {
        &self.store
    }

    /// One coarse cycle over the live-events list.
    pub async fn sync_live_matches(&self) -> CycleReport {
        let report = match self.client.fetch_live_events().await {
            Some(data) => apply_live_payload(&self.store, &data),
            None => {
                info!("no live feed data this cycle");
                CycleReport::default()
            }
        };

        let _ = self.events.log(&SyncCycleEvent {
            ts: now_iso(),
            event: "SYNC_CYCLE",
            feed_items: report.feed_items,
            matches_synced: report.synced,
            failed_items: report.failed,
        });

        info!(
            "live sync done: {}/{} matches synced ({} failed)",
            report.synced, report.feed_items, report.failed
        );
        report
    }

    /// Fine-grained per-match import, guarded against quota waste.
    pub async fn fetch_match_details(&self, local_match_id: i64) -> Result<DetailOutcome> {
        let m = match self.store.match_by_local_id(local_match_id)? {
            Some(m) => m,
            None => {
                warn!("match {local_match_id} not found locally");
                return Ok(DetailOutcome::NotFound);
            }
        };

        // quota guard: the two detail calls are only spent once per match
        if self.store.has_details(m.id)? {
            info!("match {} (api {}) already has details, skipping fetch", m.id, m.api_id);
            let _ = self.events.log(&MatchDetailsEvent {
                ts: now_iso(),
                event: "MATCH_DETAILS",
                api_match_id: m.api_id,
                events_created: 0,
                lineups_created: 0,
                skipped: true,
            });
            return Ok(DetailOutcome::AlreadyImported);
        }

        // incidents and lineups are independent: one failing call must not
        // block the other
        let events_created = match self.client.fetch_incidents(m.api_id).await {
            Some(data) => apply_incidents_payload(&self.store, m.id, &data),
            None => 0,
        };

        let lineups_created = match self.client.fetch_lineups(m.api_id).await {
            Some(data) => apply_lineups_payload(&self.store, m.id, &data),
            None => 0,
        };

        let _ = self.events.log(&MatchDetailsEvent {
            ts: now_iso(),
            event: "MATCH_DETAILS",
            api_match_id: m.api_id,
            events_created,
            lineups_created,
            skipped: false,
        });

        info!(
            "match {} (api {}): stored {} events, {} lineup entries",
            m.id, m.api_id, events_created, lineups_created
        );
        Ok(DetailOutcome::Fetched { events_created, lineups_created })
    }

    /// Administrative: delete stored details, then refetch. Empty id set
    /// means every stored match. The delete is what lets the detail fetch
    /// run again: the quota guard sees an empty match.
    pub async fn reimport(&self, match_ids: &[i64]) -> Result<ReimportReport> {
        let targets = if match_ids.is_empty() {
            self.store.all_matches()?
        } else {
            let mut found = Vec::new();
            for &id in match_ids {
                match self.store.match_by_local_id(id)? {
                    Some(m) => found.push(m),
                    None => warn!("reimport: match {id} not found locally, skipping"),
                }
            }
            found
        };

        let mut report = ReimportReport::default();

        for m in targets {
            let mut outcome = ReimportMatchOutcome {
                local_id: m.id,
                api_id: m.api_id,
                events_deleted: 0,
                lineups_deleted: 0,
                outcome: None,
                error: None,
            };

            let fetch_result = match self.store.delete_match_details(m.id) {
                Ok((events_deleted, lineups_deleted)) => {
                    outcome.events_deleted = events_deleted;
                    outcome.lineups_deleted = lineups_deleted;
                    report.events_deleted += events_deleted;
                    report.lineups_deleted += lineups_deleted;
                    self.fetch_match_details(m.id).await
                }
                Err(e) => Err(e),
            };

            match fetch_result {
                Ok(detail) => {
                    outcome.outcome = Some(detail);
                    report.ok += 1;
                }
                Err(e) => {
                    warn!("reimport of match {} failed: {e:#}", m.id);
                    outcome.error = Some(format!("{e:#}"));
                    report.failed += 1;
                }
            }
            report.matches.push(outcome);
        }

        let _ = self.events.log(&ReimportEvent {
            ts: now_iso(),
            event: "REIMPORT",
            matches_total: report.matches.len(),
            matches_ok: report.ok,
            matches_failed: report.failed,
            events_deleted: report.events_deleted,
            lineups_deleted: report.lineups_deleted,
        });

        Ok(report)
    }
}

// ── Payload application (pure of HTTP) ────────────────────────────────────────

/// Reconciles one live-events payload. Item failures are logged and
/// skipped; the batch always runs to the end.
pub fn apply_live_payload(store: &MatchStore, data: &Value) -> CycleReport {
    let items = match data["events"].as_array() {
        Some(items) => items,
        None => {
            warn!("live feed payload has no events array");
            return CycleReport::default();
        }
    };

    let mut report = CycleReport { feed_items: items.len(), ..CycleReport::default() };
    for item in items {
        match sync_one_live_event(store, item) {
            Ok(_) => report.synced += 1,
            Err(e) => {
                warn!("live item {} failed: {e:#}", item["id"]);
                report.failed += 1;
            }
        }
    }
    report
}

fn sync_one_live_event(store: &MatchStore, item: &Value) -> Result<i64> {
    let api_id = item["id"].as_i64().context("missing match id")?;

    let tournament = item.get("tournament").context("missing tournament")?;
    let league_api_id = id_string(&tournament["id"]).context("missing tournament id")?;
    let league_name = tournament["name"].as_str().context("missing tournament name")?;
    // absent category → sentinel country
    let country = tournament.pointer("/category/name").and_then(Value::as_str).unwrap_or("Other");
    let league_id = store.upsert_league(&league_api_id, league_name, Some(country))?;

    let home_team_id = store.get_or_create_team(
        item.pointer("/homeTeam/id").and_then(Value::as_i64).context("missing home team id")?,
        item.pointer("/homeTeam/name").and_then(Value::as_str).context("missing home team name")?,
        None,
    )?;
    let away_team_id = store.get_or_create_team(
        item.pointer("/awayTeam/id").and_then(Value::as_i64).context("missing away team id")?,
        item.pointer("/awayTeam/name").and_then(Value::as_str).context("missing away team name")?,
        None,
    )?;

    store.upsert_match(&MatchUpsert {
        api_id,
        league_id: Some(league_id),
        home_team_id: Some(home_team_id),
        away_team_id: Some(away_team_id),
        // a missing score object means nothing happened yet
        home_score: item.pointer("/homeScore/current").and_then(Value::as_i64).unwrap_or(0),
        away_score: item.pointer("/awayScore/current").and_then(Value::as_i64).unwrap_or(0),
        status: item
            .pointer("/status/description")
            .and_then(Value::as_str)
            .context("missing status")?,
        country_name: Some(country),
    })
}

/// Stores every mapped incident from one incidents payload. Returns how
/// many rows were created (duplicates by upstream id are skipped).
pub fn apply_incidents_payload(store: &MatchStore, match_id: i64, data: &Value) -> usize {
    let incidents = match data["incidents"].as_array() {
        Some(list) => list,
        None => return 0,
    };

    let mut created = 0;
    for item in incidents {
        let row = map_incident(item).flatten();
        match store.insert_event(match_id, &row) {
            Ok(true) => created += 1,
            Ok(false) => {}
            // a bad row must not sink the rest of the batch
            Err(e) => warn!("storing incident '{}' failed: {e:#}", row.event_id),
        }
    }
    info!("stored {created} new events (of {} in feed)", incidents.len());
    created
}

/// Stores both sides of one lineups payload: players, formations and the
/// missing-player list. Returns how many lineup rows were created.
pub fn apply_lineups_payload(store: &MatchStore, match_id: i64, data: &Value) -> usize {
    let mut created = 0;

    for (side_key, is_home) in [("home", true), ("away", false)] {
        let side = &data[side_key];

        if let Some(players) = side["players"].as_array() {
            for p in players {
                let entry = lineup_entry_from_item(p, is_home);
                match store.get_or_create_lineup(match_id, &entry) {
                    Ok(true) => created += 1,
                    Ok(false) => {}
                    Err(e) => warn!("storing lineup '{}' failed: {e:#}", entry.player_name),
                }
            }
        }

        if let Some(missing) = side["missingPlayers"].as_array() {
            for item in missing {
                let p = missing_player_from_item(item, is_home);
                if let Err(e) = store.add_missing_player(match_id, &p) {
                    warn!("storing missing player '{}' failed: {e:#}", p.player_name);
                }
            }
        }
    }

    let home_formation = data.pointer("/home/formation").and_then(Value::as_str);
    let away_formation = data.pointer("/away/formation").and_then(Value::as_str);
    if home_formation.is_some() || away_formation.is_some() {
        if let Err(e) = store.set_match_formations(match_id, home_formation, away_formation) {
            warn!("storing formations failed: {e:#}");
        }
    }

    created
}

fn lineup_entry_from_item(p: &Value, is_home: bool) -> NewLineupEntry {
    NewLineupEntry {
        player_name: p
            .pointer("/player/name")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_PLAYER)
            .to_string(),
        player_api_id: p.pointer("/player/id").and_then(Value::as_i64),
        // jerseyNumber lives on the player object, shirtNumber on the entry
        shirt_number: p
            .pointer("/player/jerseyNumber")
            .and_then(int_value)
            .or_else(|| int_value(&p["shirtNumber"])),
        position: p.pointer("/player/position").and_then(Value::as_str).map(str::to_string),
        is_home_team: is_home,
        is_starting_xi: !p["substitute"].as_bool().unwrap_or(false),
        is_captain: p["captain"].as_bool().unwrap_or(false),
        avg_rating: rating_string(p.pointer("/statistics/rating")),
    }
}

fn missing_player_from_item(item: &Value, is_home: bool) -> NewMissingPlayer {
    NewMissingPlayer {
        player_name: item
            .pointer("/player/name")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_PLAYER)
            .to_string(),
        kind: item["type"].as_str().unwrap_or("missing").to_string(),
        reason: match &item["reason"] {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        },
        is_home_team: is_home,
    }
}

/// Upstream ids show up as numbers or strings depending on endpoint age.
fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Shirt numbers arrive as integers or numeric strings.
fn int_value(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

/// Ratings arrive as floats or strings; stored verbatim as text.
fn rating_string(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
