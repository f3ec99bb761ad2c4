//! MatchdayLive — Incident mapper
//!
//! Turns one raw incident object from the feed into a canonical record.
//! The feed is loosely typed: nested player objects may be replaced by flat
//! `playerName`-style fields, ids may be numbers or strings, and any field
//! can be null. Extraction never fails: missing data becomes a default.
//!
//! Recognized `incidentType` tags: goal, card, substitution, period,
//! injuryTime, varDecision. Anything else lands in `Other` with a
//! best-effort player name and free text.

use serde::Serialize;
use serde_json::Value;

/// Type-specific payload, one variant per recognized incident type.
#[derive(Debug, Clone, PartialEq)]
pub enum IncidentDetails {
    Goal {
        player_name: String,
        assist_player_name: Option<String>,
        assist2_player_name: Option<String>,
        home_score: Option<i64>,
        away_score: Option<i64>,
        /// regular | ownGoal | penalty | missedPenalty | penaltyNotAwarded
        incident_class: Option<String>,
    },
    Card {
        player_name: String,
        /// yellow | yellowRed | red
        incident_class: Option<String>,
        reason: Option<String>,
        rescinded: bool,
    },
    Substitution {
        player_in_name: String,
        player_out_name: String,
        injury: bool,
    },
    Period {
        text: Option<String>,
        home_score: Option<i64>,
        away_score: Option<i64>,
        is_live: bool,
    },
    InjuryTime {
        length: Option<i64>,
    },
    VarDecision {
        player_name: String,
        incident_class: Option<String>,
        /// VAR outcome is tri-state: confirmed / overturned / unknown
        confirmed: Option<bool>,
    },
    Other {
        player_name: String,
        text: Option<String>,
        incident_class: Option<String>,
    },
}

/// One mapped incident: fields common to every type plus the typed payload.
#[derive(Debug, Clone)]
pub struct MappedIncident {
    pub incident_type: String,
    /// Stringified upstream id, `""` when the feed item carries none.
    pub event_id: String,
    pub time: i64,
    pub added_time: i64,
    pub is_home_team: bool,
    pub details: IncidentDetails,
}

/// Wide row shape the store persists. `flatten()` produces this so the
/// store never needs to know about the enum.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewEvent {
    pub event_id: String,
    pub incident_type: String,
    pub incident_class: Option<String>,
    pub time: i64,
    pub added_time: i64,
    pub is_home_team: bool,
    pub player_name: Option<String>,
    pub assist_player_name: Option<String>,
    pub assist2_player_name: Option<String>,
    pub player_in_name: Option<String>,
    pub player_out_name: Option<String>,
    pub injury: bool,
    pub reason: Option<String>,
    pub rescinded: bool,
    pub text: Option<String>,
    pub is_live: bool,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
    pub length: Option<i64>,
    pub confirmed: Option<bool>,
}

// ── JSON access helpers ───────────────────────────────────────────────────────

/// Nested lookup with a flat-field fallback, e.g. `player.name` → `playerName`.
/// An empty nested string falls through to the flat field too.
fn nested_or_flat(item: &Value, pointer: &str, flat: &str) -> Option<String> {
    item.pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .or_else(|| item[flat].as_str())
        .map(str::to_string)
}

fn opt_str(item: &Value, key: &str) -> Option<String> {
    item[key].as_str().map(str::to_string)
}

// ── Per-type mappers ──────────────────────────────────────────────────────────

fn map_goal(item: &Value) -> IncidentDetails {
    IncidentDetails::Goal {
        player_name: nested_or_flat(item, "/player/name", "playerName").unwrap_or_default(),
        assist_player_name: nested_or_flat(item, "/assist1/name", "assist1Name"),
        assist2_player_name: nested_or_flat(item, "/assist2/name", "assist2Name"),
        home_score: item["homeScore"].as_i64(),
        away_score: item["awayScore"].as_i64(),
        incident_class: opt_str(item, "incidentClass"),
    }
}

fn map_card(item: &Value) -> IncidentDetails {
    IncidentDetails::Card {
        player_name: nested_or_flat(item, "/player/name", "playerName").unwrap_or_default(),
        incident_class: opt_str(item, "incidentClass"),
        reason: opt_str(item, "reason"),
        rescinded: item["rescinded"].as_bool().unwrap_or(false),
    }
}

fn map_substitution(item: &Value) -> IncidentDetails {
    IncidentDetails::Substitution {
        player_in_name: nested_or_flat(item, "/playerIn/name", "playerNameIn").unwrap_or_default(),
        player_out_name: nested_or_flat(item, "/playerOut/name", "playerNameOut")
            .unwrap_or_default(),
        injury: item["injury"].as_bool().unwrap_or(false),
    }
}

fn map_period(item: &Value) -> IncidentDetails {
    IncidentDetails::Period {
        text: opt_str(item, "text"),
        home_score: item["homeScore"].as_i64(),
        away_score: item["awayScore"].as_i64(),
        is_live: item["isLive"].as_bool().unwrap_or(false),
    }
}

fn map_injury_time(item: &Value) -> IncidentDetails {
    IncidentDetails::InjuryTime { length: item["length"].as_i64() }
}

fn map_var_decision(item: &Value) -> IncidentDetails {
    IncidentDetails::VarDecision {
        player_name: nested_or_flat(item, "/player/name", "playerName").unwrap_or_default(),
        incident_class: opt_str(item, "incidentClass"),
        confirmed: item["confirmed"].as_bool(),
    }
}

fn map_other(item: &Value) -> IncidentDetails {
    IncidentDetails::Other {
        player_name: item.pointer("/player/name").and_then(Value::as_str).unwrap_or("").to_string(),
        text: opt_str(item, "text"),
        incident_class: opt_str(item, "incidentClass"),
    }
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

/// Maps one raw incident item. Total: every input yields a record.
pub fn map_incident(item: &Value) -> MappedIncident {
    let incident_type = item["incidentType"].as_str().unwrap_or("").to_string();

    // ids arrive as numbers; legacy payloads occasionally as strings
    let event_id = match &item["id"] {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => String::new(),
    };

    let details = match incident_type.as_str() {
        "goal" => map_goal(item),
        "card" => map_card(item),
        "substitution" => map_substitution(item),
        "period" => map_period(item),
        "injuryTime" => map_injury_time(item),
        "varDecision" => map_var_decision(item),
        _ => map_other(item),
    };

    MappedIncident {
        incident_type,
        event_id,
        time: item["time"].as_i64().unwrap_or(0),
        added_time: item["addedTime"].as_i64().unwrap_or(0),
        // period markers and announcements come without a side
        is_home_team: item["isHome"].as_bool().unwrap_or(true),
        details,
    }
}

impl MappedIncident {
    /// Flattens the typed payload into the wide storage row.
    pub fn flatten(self) -> NewEvent {
        let mut row = NewEvent {
            event_id: self.event_id,
            incident_type: self.incident_type,
            time: self.time,
            added_time: self.added_time,
            is_home_team: self.is_home_team,
            ..NewEvent::default()
        };

        match self.details {
            IncidentDetails::Goal {
                player_name,
                assist_player_name,
                assist2_player_name,
                home_score,
                away_score,
                incident_class,
            } => {
                row.player_name = Some(player_name);
                row.assist_player_name = assist_player_name;
                row.assist2_player_name = assist2_player_name;
                row.home_score = home_score;
                row.away_score = away_score;
                row.incident_class = incident_class;
            }
            IncidentDetails::Card { player_name, incident_class, reason, rescinded } => {
                row.player_name = Some(player_name);
                row.incident_class = incident_class;
                row.reason = reason;
                row.rescinded = rescinded;
            }
            IncidentDetails::Substitution { player_in_name, player_out_name, injury } => {
                // incoming player doubles as the generic player field
                row.player_name = Some(player_in_name.clone());
                row.player_in_name = Some(player_in_name);
                row.player_out_name = Some(player_out_name);
                row.injury = injury;
            }
            IncidentDetails::Period { text, home_score, away_score, is_live } => {
                row.text = text;
                row.home_score = home_score;
                row.away_score = away_score;
                row.is_live = is_live;
            }
            IncidentDetails::InjuryTime { length } => {
                row.length = length;
            }
            IncidentDetails::VarDecision { player_name, incident_class, confirmed } => {
                row.player_name = Some(player_name);
                row.incident_class = incident_class;
                row.confirmed = confirmed;
            }
            IncidentDetails::Other { player_name, text, incident_class } => {
                row.player_name = Some(player_name);
                row.text = text;
                row.incident_class = incident_class;
            }
        }

        row
    }
}
