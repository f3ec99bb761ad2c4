//! MatchdayLive — match store
//!
//! SQLite persistence for leagues, teams, matches and their child rows.
//! External (upstream) ids are the idempotency keys: the live feed is
//! replayed every cycle and every write here is either a keyed upsert or a
//! get-or-create, so re-running a cycle never duplicates rows.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;

pub mod models;

pub use models::{
    League, LineupEntry, MatchEvent, MissingPlayer, NewLineupEntry, NewMissingPlayer, StoredMatch,
    Team, UNKNOWN_PLAYER,
};

use incident_mapper::NewEvent;

/// Match fields written on every live-sync cycle.
#[derive(Debug, Clone)]
pub struct MatchUpsert<'a> {
    pub api_id: i64,
    pub league_id: Option<i64>,
    pub home_team_id: Option<i64>,
    pub away_team_id: Option<i64>,
    pub home_score: i64,
    pub away_score: i64,
    pub status: &'a str,
    pub country_name: Option<&'a str>,
}

/// Matches for one league on the listing page.
#[derive(Debug, Clone)]
pub struct LeagueGroup {
    pub name: String,
    pub matches: Vec<StoredMatch>,
}

/// Leagues for one country on the listing page.
#[derive(Debug, Clone)]
pub struct CountryGroup {
    pub country: String,
    pub leagues: Vec<LeagueGroup>,
}

pub struct MatchStore {
    conn: Connection,
}

impl MatchStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path).context("open sqlite db")?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        conn.pragma_update(None, "foreign_keys", "ON").context("enable foreign keys")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory db")?;
        conn.pragma_update(None, "foreign_keys", "ON").context("enable foreign keys")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    // ── Write path ────────────────────────────────────────────────────────────

    /// Create on first sight. On re-sight: backfill an empty country,
    /// overwrite a changed name. Returns the local id.
    pub fn upsert_league(&self, api_id: &str, name: &str, country: Option<&str>) -> Result<i64> {
        let existing: Option<(i64, String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT id, name, country FROM leagues WHERE api_id = ?1",
                params![api_id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()
            .context("lookup league")?;

        match existing {
            None => {
                self.conn
                    .execute(
                        "INSERT INTO leagues(api_id, name, country) VALUES (?1, ?2, ?3)",
                        params![api_id, name, country],
                    )
                    .context("insert league")?;
                Ok(self.conn.last_insert_rowid())
            }
            Some((id, stored_name, stored_country)) => {
                let country_missing = stored_country.as_deref().map_or(true, str::is_empty);
                let backfill = country.filter(|c| country_missing && !c.is_empty());
                if stored_name != name || backfill.is_some() {
                    let new_country = backfill.map(str::to_string).or(stored_country);
                    self.conn
                        .execute(
                            "UPDATE leagues SET name = ?2, country = ?3 WHERE id = ?1",
                            params![id, name, new_country],
                        )
                        .context("update league")?;
                }
                Ok(id)
            }
        }
    }

    /// Create-if-absent; the name is never refreshed after creation.
    pub fn get_or_create_team(&self, api_id: i64, name: &str, logo_url: Option<&str>) -> Result<i64> {
        let existing: Option<i64> = self
            .conn
            .query_row("SELECT id FROM teams WHERE api_id = ?1", params![api_id], |r| r.get(0))
            .optional()
            .context("lookup team")?;
        if let Some(id) = existing {
            return Ok(id);
        }
        self.conn
            .execute(
                "INSERT INTO teams(api_id, name, logo_url) VALUES (?1, ?2, ?3)",
                params![api_id, name, logo_url],
            )
            .context("insert team")?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Keyed on api_id; scores, status and relationships are overwritten on
    /// every cycle. Returns the local id.
    pub fn upsert_match(&self, m: &MatchUpsert) -> Result<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO matches(api_id, league_id, home_team_id, away_team_id,
                                    home_score, away_score, status, country_name)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(api_id) DO UPDATE SET
                    league_id=excluded.league_id,
                    home_team_id=excluded.home_team_id,
                    away_team_id=excluded.away_team_id,
                    home_score=excluded.home_score,
                    away_score=excluded.away_score,
                    status=excluded.status,
                    country_name=excluded.country_name
                "#,
                params![
                    m.api_id,
                    m.league_id,
                    m.home_team_id,
                    m.away_team_id,
                    m.home_score,
                    m.away_score,
                    m.status,
                    m.country_name,
                ],
            )
            .context("upsert match")?;

        self.conn
            .query_row("SELECT id FROM matches WHERE api_id = ?1", params![m.api_id], |r| r.get(0))
            .context("read back match id")
    }

    /// Events with an upstream id are created at most once per
    /// (match, event_id); events without one are always inserted.
    /// Returns true when a row was created.
    pub fn insert_event(&self, match_id: i64, row: &NewEvent) -> Result<bool> {
        if !row.event_id.is_empty() {
            let exists: Option<i64> = self
                .conn
                .query_row(
                    "SELECT id FROM match_events WHERE match_id = ?1 AND event_id = ?2",
                    params![match_id, row.event_id],
                    |r| r.get(0),
                )
                .optional()
                .context("lookup event")?;
            if exists.is_some() {
                return Ok(false);
            }
        }

        let event_id: Option<&str> =
            if row.event_id.is_empty() { None } else { Some(&row.event_id) };

        self.conn
            .execute(
                r#"
                INSERT INTO match_events(
                    match_id, event_id, incident_type, incident_class, time, added_time,
                    is_home_team, player_name, assist_player_name, assist2_player_name,
                    player_in_name, player_out_name, injury, reason, rescinded, text,
                    is_live, home_score, away_score, length, confirmed)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                        ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)
                "#,
                params![
                    match_id,
                    event_id,
                    row.incident_type,
                    row.incident_class,
                    row.time,
                    row.added_time,
                    row.is_home_team,
                    row.player_name,
                    row.assist_player_name,
                    row.assist2_player_name,
                    row.player_in_name,
                    row.player_out_name,
                    row.injury,
                    row.reason,
                    row.rescinded,
                    row.text,
                    row.is_live,
                    row.home_score,
                    row.away_score,
                    row.length,
                    row.confirmed,
                ],
            )
            .context("insert event")?;
        Ok(true)
    }

    /// Keyed on (match, player name, side); fields are set only at creation
    /// time; a repeat fetch never refreshes statistics. Returns true when a
    /// row was created.
    pub fn get_or_create_lineup(&self, match_id: i64, e: &NewLineupEntry) -> Result<bool> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM match_lineups
                 WHERE match_id = ?1 AND player_name = ?2 AND is_home_team = ?3",
                params![match_id, e.player_name, e.is_home_team],
                |r| r.get(0),
            )
            .optional()
            .context("lookup lineup entry")?;
        if exists.is_some() {
            return Ok(false);
        }

        self.conn
            .execute(
                r#"
                INSERT INTO match_lineups(
                    match_id, player_name, player_api_id, shirt_number, position,
                    is_home_team, is_starting_xi, is_captain, avg_rating)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    match_id,
                    e.player_name,
                    e.player_api_id,
                    e.shirt_number,
                    e.position,
                    e.is_home_team,
                    e.is_starting_xi,
                    e.is_captain,
                    e.avg_rating,
                ],
            )
            .context("insert lineup entry")?;
        Ok(true)
    }

    pub fn add_missing_player(&self, match_id: i64, p: &NewMissingPlayer) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO missing_players(match_id, player_name, kind, reason, is_home_team)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![match_id, p.player_name, p.kind, p.reason, p.is_home_team],
            )
            .context("insert missing player")?;
        Ok(())
    }

    /// Formations arrive with the lineups payload; absent values keep
    /// whatever is already stored.
    pub fn set_match_formations(
        &self,
        match_id: i64,
        home: Option<&str>,
        away: Option<&str>,
    ) -> Result<()> {
        self.conn
            .execute(
                "UPDATE matches SET
                     home_formation = COALESCE(?2, home_formation),
                     away_formation = COALESCE(?3, away_formation)
                 WHERE id = ?1",
                params![match_id, home, away],
            )
            .context("set formations")?;
        Ok(())
    }

    /// Deletes stored events and lineups for a match (reimport step one).
    /// Returns (events_deleted, lineups_deleted).
    pub fn delete_match_details(&self, match_id: i64) -> Result<(usize, usize)> {
        let events = self
            .conn
            .execute("DELETE FROM match_events WHERE match_id = ?1", params![match_id])
            .context("delete events")?;
        let lineups = self
            .conn
            .execute("DELETE FROM match_lineups WHERE match_id = ?1", params![match_id])
            .context("delete lineups")?;
        Ok((events, lineups))
    }

    /// Removes a match; child rows go with it (cascade).
    pub fn delete_match(&self, match_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM matches WHERE id = ?1", params![match_id])
            .context("delete match")?;
        Ok(())
    }

    // ── Read path ─────────────────────────────────────────────────────────────

    /// Quota-guard predicate: any stored events or lineup entries.
    pub fn has_details(&self, match_id: i64) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 WHERE EXISTS (SELECT 1 FROM match_events WHERE match_id = ?1)
                       OR EXISTS (SELECT 1 FROM match_lineups WHERE match_id = ?1)",
                params![match_id],
                |r| r.get(0),
            )
            .optional()
            .context("check details")?;
        Ok(found.is_some())
    }

    pub fn match_by_local_id(&self, id: i64) -> Result<Option<StoredMatch>> {
        self.conn
            .query_row(
                &format!("SELECT {MATCH_COLS} FROM matches WHERE id = ?1"),
                params![id],
                match_from_row,
            )
            .optional()
            .context("match by local id")
    }

    pub fn match_by_api_id(&self, api_id: i64) -> Result<Option<StoredMatch>> {
        self.conn
            .query_row(
                &format!("SELECT {MATCH_COLS} FROM matches WHERE api_id = ?1"),
                params![api_id],
                match_from_row,
            )
            .optional()
            .context("match by api id")
    }

    pub fn all_matches(&self) -> Result<Vec<StoredMatch>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {MATCH_COLS} FROM matches ORDER BY id"))
            .context("prepare all matches")?;
        let rows = stmt.query_map([], match_from_row).context("query all matches")?;
        rows.collect::<rusqlite::Result<_>>().context("collect matches")
    }

    /// Matches with no stored events and no stored lineups: candidates for
    /// a quota-budgeted detail fetch.
    pub fn matches_missing_details(&self, limit: usize) -> Result<Vec<StoredMatch>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {MATCH_COLS} FROM matches m
                 WHERE NOT EXISTS (SELECT 1 FROM match_events e WHERE e.match_id = m.id)
                   AND NOT EXISTS (SELECT 1 FROM match_lineups l WHERE l.match_id = m.id)
                 ORDER BY m.id DESC LIMIT ?1"
            ))
            .context("prepare missing details")?;
        let rows = stmt
            .query_map(params![limit as i64], match_from_row)
            .context("query missing details")?;
        rows.collect::<rusqlite::Result<_>>().context("collect missing details")
    }

    /// Timeline order: base minute, added minute, insertion order.
    pub fn events_for_match(&self, match_id: i64) -> Result<Vec<MatchEvent>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {EVENT_COLS} FROM match_events
                 WHERE match_id = ?1 ORDER BY time, added_time, id"
            ))
            .context("prepare events")?;
        let rows = stmt.query_map(params![match_id], event_from_row).context("query events")?;
        rows.collect::<rusqlite::Result<_>>().context("collect events")
    }

    /// One side of a lineup, starters or bench, in shirt-number order.
    pub fn lineups_for_match(
        &self,
        match_id: i64,
        is_home: bool,
        starting_xi: bool,
    ) -> Result<Vec<LineupEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {LINEUP_COLS} FROM match_lineups
                 WHERE match_id = ?1 AND is_home_team = ?2 AND is_starting_xi = ?3
                 ORDER BY shirt_number"
            ))
            .context("prepare lineups")?;
        let rows = stmt
            .query_map(params![match_id, is_home, starting_xi], lineup_from_row)
            .context("query lineups")?;
        rows.collect::<rusqlite::Result<_>>().context("collect lineups")
    }

    /// Full squad for one side: starters first, then bench, by shirt number.
    pub fn squad_for_match_side(&self, match_id: i64, is_home: bool) -> Result<Vec<LineupEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {LINEUP_COLS} FROM match_lineups
                 WHERE match_id = ?1 AND is_home_team = ?2
                 ORDER BY is_starting_xi DESC, shirt_number"
            ))
            .context("prepare squad")?;
        let rows = stmt
            .query_map(params![match_id, is_home], lineup_from_row)
            .context("query squad")?;
        rows.collect::<rusqlite::Result<_>>().context("collect squad")
    }

    pub fn missing_players_for_match(&self, match_id: i64) -> Result<Vec<MissingPlayer>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, match_id, player_name, kind, reason, is_home_team
                 FROM missing_players WHERE match_id = ?1 ORDER BY id",
            )
            .context("prepare missing players")?;
        let rows = stmt
            .query_map(params![match_id], |r| {
                Ok(MissingPlayer {
                    id: r.get(0)?,
                    match_id: r.get(1)?,
                    player_name: r.get(2)?,
                    kind: r.get(3)?,
                    reason: r.get(4)?,
                    is_home_team: r.get(5)?,
                })
            })
            .context("query missing players")?;
        rows.collect::<rusqlite::Result<_>>().context("collect missing players")
    }

    /// Local team search by name fragment (case-insensitive).
    pub fn search_teams(&self, query: &str, limit: usize) -> Result<Vec<Team>> {
        let pattern = format!("%{}%", query);
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, api_id, name, logo_url FROM teams
                 WHERE name LIKE ?1 ORDER BY name LIMIT ?2",
            )
            .context("prepare team search")?;
        let rows = stmt
            .query_map(params![pattern, limit as i64], team_from_row)
            .context("query team search")?;
        rows.collect::<rusqlite::Result<_>>().context("collect teams")
    }

    pub fn team_by_local_id(&self, id: i64) -> Result<Option<Team>> {
        self.conn
            .query_row(
                "SELECT id, api_id, name, logo_url FROM teams WHERE id = ?1",
                params![id],
                team_from_row,
            )
            .optional()
            .context("team by id")
    }

    pub fn league_by_local_id(&self, id: i64) -> Result<Option<League>> {
        self.conn
            .query_row(
                "SELECT id, api_id, name, country FROM leagues WHERE id = ?1",
                params![id],
                |r| {
                    Ok(League {
                        id: r.get(0)?,
                        api_id: r.get(1)?,
                        name: r.get(2)?,
                        country: r.get(3)?,
                    })
                },
            )
            .optional()
            .context("league by id")
    }

    /// Newest matches a team played on either side.
    pub fn recent_matches_for_team(&self, team_id: i64, limit: usize) -> Result<Vec<StoredMatch>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {MATCH_COLS} FROM matches
                 WHERE home_team_id = ?1 OR away_team_id = ?1
                 ORDER BY id DESC LIMIT ?2"
            ))
            .context("prepare recent matches")?;
        let rows = stmt
            .query_map(params![team_id, limit as i64], match_from_row)
            .context("query recent matches")?;
        rows.collect::<rusqlite::Result<_>>().context("collect recent matches")
    }

    /// Listing-page grouping: country → league → matches. Country comes from
    /// the match override first, the league second, "Other" last; matches
    /// with no league land under "Unknown league".
    pub fn matches_grouped_by_country(&self) -> Result<Vec<CountryGroup>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {MATCH_COLS_PREFIXED}, l.name, l.country
                 FROM matches m LEFT JOIN leagues l ON l.id = m.league_id
                 ORDER BY m.id"
            ))
            .context("prepare grouped matches")?;

        let rows = stmt
            .query_map([], |r| {
                let m = match_from_row(r)?;
                let league_name: Option<String> = r.get(12)?;
                let league_country: Option<String> = r.get(13)?;
                Ok((m, league_name, league_country))
            })
            .context("query grouped matches")?;

        let mut grouped: BTreeMap<String, BTreeMap<String, Vec<StoredMatch>>> = BTreeMap::new();
        for row in rows {
            let (m, league_name, league_country) = row.context("read grouped row")?;
            let country = m
                .country_name
                .clone()
                .filter(|c| !c.is_empty())
                .or(league_country)
                .unwrap_or_else(|| "Other".to_string());
            let league = league_name.unwrap_or_else(|| "Unknown league".to_string());
            grouped.entry(country).or_default().entry(league).or_default().push(m);
        }

        Ok(grouped
            .into_iter()
            .map(|(country, leagues)| CountryGroup {
                country,
                leagues: leagues
                    .into_iter()
                    .map(|(name, matches)| LeagueGroup { name, matches })
                    .collect(),
            })
            .collect())
    }
}

// ── Schema / row mapping ──────────────────────────────────────────────────────

const MATCH_COLS: &str = "id, api_id, league_id, home_team_id, away_team_id, country_name, \
     home_score, away_score, status, match_time, home_formation, away_formation";

const MATCH_COLS_PREFIXED: &str =
    "m.id, m.api_id, m.league_id, m.home_team_id, m.away_team_id, m.country_name, \
     m.home_score, m.away_score, m.status, m.match_time, m.home_formation, m.away_formation";

const EVENT_COLS: &str = "id, match_id, event_id, incident_type, incident_class, time, \
     added_time, is_home_team, player_name, assist_player_name, assist2_player_name, \
     player_in_name, player_out_name, injury, reason, rescinded, text, is_live, \
     home_score, away_score, length, confirmed";

const LINEUP_COLS: &str = "id, match_id, player_name, player_api_id, shirt_number, position, \
     is_home_team, is_starting_xi, is_captain, avg_rating";

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS leagues (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            api_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            country TEXT
        );

        CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            api_id INTEGER NOT NULL UNIQUE,
            name TEXT NOT NULL,
            logo_url TEXT
        );

        CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            api_id INTEGER NOT NULL UNIQUE,
            league_id INTEGER REFERENCES leagues(id) ON DELETE CASCADE,
            home_team_id INTEGER REFERENCES teams(id) ON DELETE CASCADE,
            away_team_id INTEGER REFERENCES teams(id) ON DELETE CASCADE,
            country_name TEXT,
            home_score INTEGER NOT NULL DEFAULT 0,
            away_score INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL,
            match_time TEXT,
            home_formation TEXT,
            away_formation TEXT
        );

        CREATE TABLE IF NOT EXISTS match_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id INTEGER NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
            event_id TEXT,
            incident_type TEXT NOT NULL,
            incident_class TEXT,
            time INTEGER NOT NULL,
            added_time INTEGER NOT NULL DEFAULT 0,
            is_home_team INTEGER NOT NULL DEFAULT 1,
            player_name TEXT,
            assist_player_name TEXT,
            assist2_player_name TEXT,
            player_in_name TEXT,
            player_out_name TEXT,
            injury INTEGER NOT NULL DEFAULT 0,
            reason TEXT,
            rescinded INTEGER NOT NULL DEFAULT 0,
            text TEXT,
            is_live INTEGER NOT NULL DEFAULT 0,
            home_score INTEGER,
            away_score INTEGER,
            length INTEGER,
            confirmed INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_events_match ON match_events(match_id);
        CREATE INDEX IF NOT EXISTS idx_events_event_id ON match_events(event_id);

        CREATE TABLE IF NOT EXISTS match_lineups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id INTEGER NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
            player_name TEXT NOT NULL,
            player_api_id INTEGER,
            shirt_number INTEGER,
            position TEXT,
            is_home_team INTEGER NOT NULL DEFAULT 1,
            is_starting_xi INTEGER NOT NULL DEFAULT 1,
            is_captain INTEGER NOT NULL DEFAULT 0,
            avg_rating TEXT,
            UNIQUE(match_id, player_name, is_home_team)
        );

        CREATE TABLE IF NOT EXISTS missing_players (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id INTEGER NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
            player_name TEXT NOT NULL,
            kind TEXT NOT NULL,
            reason TEXT,
            is_home_team INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .context("init schema")?;
    Ok(())
}

fn match_from_row(r: &Row) -> rusqlite::Result<StoredMatch> {
    Ok(StoredMatch {
        id: r.get(0)?,
        api_id: r.get(1)?,
        league_id: r.get(2)?,
        home_team_id: r.get(3)?,
        away_team_id: r.get(4)?,
        country_name: r.get(5)?,
        home_score: r.get(6)?,
        away_score: r.get(7)?,
        status: r.get(8)?,
        match_time: r.get(9)?,
        home_formation: r.get(10)?,
        away_formation: r.get(11)?,
    })
}

fn event_from_row(r: &Row) -> rusqlite::Result<MatchEvent> {
    Ok(MatchEvent {
        id: r.get(0)?,
        match_id: r.get(1)?,
        event_id: r.get(2)?,
        incident_type: r.get(3)?,
        incident_class: r.get(4)?,
        time: r.get(5)?,
        added_time: r.get(6)?,
        is_home_team: r.get(7)?,
        player_name: r.get(8)?,
        assist_player_name: r.get(9)?,
        assist2_player_name: r.get(10)?,
        player_in_name: r.get(11)?,
        player_out_name: r.get(12)?,
        injury: r.get(13)?,
        reason: r.get(14)?,
        rescinded: r.get(15)?,
        text: r.get(16)?,
        is_live: r.get(17)?,
        home_score: r.get(18)?,
        away_score: r.get(19)?,
        length: r.get(20)?,
        confirmed: r.get(21)?,
    })
}

fn lineup_from_row(r: &Row) -> rusqlite::Result<LineupEntry> {
    Ok(LineupEntry {
        id: r.get(0)?,
        match_id: r.get(1)?,
        player_name: r.get(2)?,
        player_api_id: r.get(3)?,
        shirt_number: r.get(4)?,
        position: r.get(5)?,
        is_home_team: r.get(6)?,
        is_starting_xi: r.get(7)?,
        is_captain: r.get(8)?,
        avg_rating: r.get(9)?,
    })
}

fn team_from_row(r: &Row) -> rusqlite::Result<Team> {
    Ok(Team { id: r.get(0)?, api_id: r.get(1)?, name: r.get(2)?, logo_url: r.get(3)? })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MatchStore {
        MatchStore::open_in_memory().unwrap()
    }

    fn seed_match(s: &MatchStore, api_id: i64) -> i64 {
        s.upsert_match(&MatchUpsert {
            api_id,
            league_id: None,
            home_team_id: None,
            away_team_id: None,
            home_score: 0,
            away_score: 0,
            status: "1st half",
            country_name: None,
        })
        .unwrap()
    }

    fn goal_event(event_id: &str, time: i64) -> NewEvent {
        NewEvent {
            event_id: event_id.to_string(),
            incident_type: "goal".to_string(),
            time,
            player_name: Some("Scorer".to_string()),
            ..NewEvent::default()
        }
    }

    #[test]
    fn league_created_then_backfilled_and_renamed() {
        let s = store();

        let id = s.upsert_league("t-17", "Premier League", None).unwrap();
        let league = s.league_by_local_id(id).unwrap().unwrap();
        assert_eq!(league.name, "Premier League");
        assert_eq!(league.country, None);

        // country backfilled once the feed supplies it
        let again = s.upsert_league("t-17", "Premier League", Some("England")).unwrap();
        assert_eq!(again, id);
        let league = s.league_by_local_id(id).unwrap().unwrap();
        assert_eq!(league.country.as_deref(), Some("England"));

        // a stored country is never overwritten, a changed name is
        s.upsert_league("t-17", "EPL", Some("United Kingdom")).unwrap();
        let league = s.league_by_local_id(id).unwrap().unwrap();
        assert_eq!(league.name, "EPL");
        assert_eq!(league.country.as_deref(), Some("England"));
    }

    #[test]
    fn team_name_is_frozen_at_creation() {
        let s = store();
        let id = s.get_or_create_team(42, "Arsenal", None).unwrap();
        let same = s.get_or_create_team(42, "Arsenal FC", None).unwrap();
        assert_eq!(id, same);
        assert_eq!(s.team_by_local_id(id).unwrap().unwrap().name, "Arsenal");
    }

    #[test]
    fn match_upsert_is_idempotent_and_overwrites() {
        let s = store();
        let home = s.get_or_create_team(1, "Home", None).unwrap();
        let away = s.get_or_create_team(2, "Away", None).unwrap();

        let first = s
            .upsert_match(&MatchUpsert {
                api_id: 500,
                league_id: None,
                home_team_id: Some(home),
                away_team_id: Some(away),
                home_score: 0,
                away_score: 0,
                status: "1st half",
                country_name: Some("Spain"),
            })
            .unwrap();

        let second = s
            .upsert_match(&MatchUpsert {
                api_id: 500,
                league_id: None,
                home_team_id: Some(home),
                away_team_id: Some(away),
                home_score: 2,
                away_score: 1,
                status: "2nd half",
                country_name: Some("Spain"),
            })
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(s.all_matches().unwrap().len(), 1);
        let m = s.match_by_local_id(first).unwrap().unwrap();
        assert_eq!((m.home_score, m.away_score), (2, 1));
        assert_eq!(m.status, "2nd half");
    }

    #[test]
    fn events_dedup_by_external_id_only() {
        let s = store();
        let m = seed_match(&s, 600);

        assert!(s.insert_event(m, &goal_event("e1", 10)).unwrap());
        assert!(!s.insert_event(m, &goal_event("e1", 10)).unwrap());
        assert_eq!(s.events_for_match(m).unwrap().len(), 1);

        // no id → no dedup possible, both rows land
        assert!(s.insert_event(m, &goal_event("", 20)).unwrap());
        assert!(s.insert_event(m, &goal_event("", 20)).unwrap());
        assert_eq!(s.events_for_match(m).unwrap().len(), 3);

        // the same external id under another match is independent
        let other = seed_match(&s, 601);
        assert!(s.insert_event(other, &goal_event("e1", 10)).unwrap());
    }

    #[test]
    fn events_ordered_by_minute_then_added_then_insertion() {
        let s = store();
        let m = seed_match(&s, 700);

        let mut late = goal_event("a", 90);
        late.added_time = 4;
        let mut stoppage = goal_event("b", 90);
        stoppage.added_time = 1;
        let early = goal_event("c", 5);

        s.insert_event(m, &late).unwrap();
        s.insert_event(m, &stoppage).unwrap();
        s.insert_event(m, &early).unwrap();

        let ids: Vec<_> = s
            .events_for_match(m)
            .unwrap()
            .into_iter()
            .map(|e| e.event_id.unwrap())
            .collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn lineup_unique_per_match_player_side() {
        let s = store();
        let m = seed_match(&s, 800);

        let entry = NewLineupEntry {
            player_name: "Saka".to_string(),
            shirt_number: Some(7),
            position: Some("F".to_string()),
            is_home_team: true,
            is_starting_xi: true,
            avg_rating: Some("7.4".to_string()),
            ..NewLineupEntry::default()
        };

        assert!(s.get_or_create_lineup(m, &entry).unwrap());
        // repeat fetch with fresher stats leaves the stored row untouched
        let mut refreshed = entry.clone();
        refreshed.avg_rating = Some("8.1".to_string());
        assert!(!s.get_or_create_lineup(m, &refreshed).unwrap());

        let stored = s.lineups_for_match(m, true, true).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].avg_rating.as_deref(), Some("7.4"));

        // same name on the other side is a different row
        let mut away = entry.clone();
        away.is_home_team = false;
        assert!(s.get_or_create_lineup(m, &away).unwrap());
    }

    #[test]
    fn quota_guard_predicate_and_detail_deletion() {
        let s = store();
        let m = seed_match(&s, 900);
        assert!(!s.has_details(m).unwrap());

        s.insert_event(m, &goal_event("e1", 12)).unwrap();
        s.get_or_create_lineup(
            m,
            &NewLineupEntry { player_name: "Kimmich".to_string(), ..NewLineupEntry::default() },
        )
        .unwrap();
        assert!(s.has_details(m).unwrap());

        let (events, lineups) = s.delete_match_details(m).unwrap();
        assert_eq!((events, lineups), (1, 1));
        assert!(!s.has_details(m).unwrap());
    }

    #[test]
    fn deleting_match_cascades_to_children() {
        let s = store();
        let m = seed_match(&s, 1000);
        s.insert_event(m, &goal_event("e1", 12)).unwrap();
        s.get_or_create_lineup(
            m,
            &NewLineupEntry { player_name: "Rice".to_string(), ..NewLineupEntry::default() },
        )
        .unwrap();
        s.add_missing_player(
            m,
            &NewMissingPlayer {
                player_name: "Partey".to_string(),
                kind: "doubtful".to_string(),
                reason: Some("1".to_string()),
                is_home_team: true,
            },
        )
        .unwrap();

        s.delete_match(m).unwrap();
        assert_eq!(s.events_for_match(m).unwrap().len(), 0);
        assert_eq!(s.squad_for_match_side(m, true).unwrap().len(), 0);
        assert_eq!(s.missing_players_for_match(m).unwrap().len(), 0);
    }

    #[test]
    fn formations_keep_existing_when_absent() {
        let s = store();
        let m = seed_match(&s, 1100);
        s.set_match_formations(m, Some("4-3-3"), None).unwrap();
        s.set_match_formations(m, None, Some("4-4-2")).unwrap();

        let stored = s.match_by_local_id(m).unwrap().unwrap();
        assert_eq!(stored.home_formation.as_deref(), Some("4-3-3"));
        assert_eq!(stored.away_formation.as_deref(), Some("4-4-2"));
    }

    #[test]
    fn team_search_and_recent_matches() {
        let s = store();
        let arsenal = s.get_or_create_team(1, "Arsenal", None).unwrap();
        let chelsea = s.get_or_create_team(2, "Chelsea", None).unwrap();

        for api_id in 0..3 {
            s.upsert_match(&MatchUpsert {
                api_id,
                league_id: None,
                home_team_id: Some(arsenal),
                away_team_id: Some(chelsea),
                home_score: 0,
                away_score: 0,
                status: "Ended",
                country_name: None,
            })
            .unwrap();
        }

        let hits = s.search_teams("arse", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Arsenal");

        let recent = s.recent_matches_for_team(arsenal, 2).unwrap();
        assert_eq!(recent.len(), 2);
        // newest first
        assert!(recent[0].api_id > recent[1].api_id);
    }

    #[test]
    fn grouping_prefers_match_country_then_league_then_other() {
        let s = store();
        let league = s.upsert_league("t-1", "La Liga", Some("Spain")).unwrap();

        s.upsert_match(&MatchUpsert {
            api_id: 1,
            league_id: Some(league),
            home_team_id: None,
            away_team_id: None,
            home_score: 0,
            away_score: 0,
            status: "Live",
            country_name: None, // falls back to league country
        })
        .unwrap();
        s.upsert_match(&MatchUpsert {
            api_id: 2,
            league_id: None,
            home_team_id: None,
            away_team_id: None,
            home_score: 0,
            away_score: 0,
            status: "Live",
            country_name: None, // no league either → Other
        })
        .unwrap();

        let groups = s.matches_grouped_by_country().unwrap();
        let countries: Vec<_> = groups.iter().map(|g| g.country.as_str()).collect();
        assert!(countries.contains(&"Spain"));
        assert!(countries.contains(&"Other"));

        let spain = groups.iter().find(|g| g.country == "Spain").unwrap();
        assert_eq!(spain.leagues[0].name, "La Liga");
        assert_eq!(spain.leagues[0].matches.len(), 1);

        let other = groups.iter().find(|g| g.country == "Other").unwrap();
        assert_eq!(other.leagues[0].name, "Unknown league");
    }
}
