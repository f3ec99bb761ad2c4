//! Stored row types + the derived-view layer.
//!
//! `MatchEvent` rows may predate the current importer. The legacy importer
//! wrote the subclass into `incident_type` (rows typed "regular", "yellow",
//! ...), encoded period markers as type "Unknown" with added_time 999, and
//! used "Unknown" as the player placeholder. The view methods below read
//! the modern field first and reinterpret the legacy one as a fallback, so
//! historical rows render without a migration.

use serde::Serialize;

/// Player-name placeholder written by the legacy importer.
pub const UNKNOWN_PLAYER: &str = "Unknown";

/// Legacy period markers carry an out-of-range added minute (999).
const PERIOD_ADDED_TIME_SENTINEL: i64 = 900;

#[derive(Debug, Clone, Serialize)]
pub struct League {
    pub id: i64,
    pub api_id: String,
    pub name: String,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Team {
    pub id: i64,
    pub api_id: i64,
    pub name: String,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredMatch {
    pub id: i64,
    pub api_id: i64,
    pub league_id: Option<i64>,
    pub home_team_id: Option<i64>,
    pub away_team_id: Option<i64>,
    pub country_name: Option<String>,
    pub home_score: i64,
    pub away_score: i64,
    pub status: String,
    pub match_time: Option<String>,
    pub home_formation: Option<String>,
    pub away_formation: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchEvent {
    pub id: i64,
    pub match_id: i64,
    /// Upstream id; NULL for rows the feed sent without one.
    pub event_id: Option<String>,
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

impl MatchEvent {
    pub fn is_goal(&self) -> bool {
        if self.incident_type == "goal" {
            return true;
        }
        // legacy rows: subclass stored in the type field
        if matches!(self.incident_type.as_str(), "regular" | "penalty" | "ownGoal") {
            return self
                .player_name
                .as_deref()
                .map_or(false, |p| !p.is_empty() && p != UNKNOWN_PLAYER);
        }
        false
    }

    pub fn is_card(&self) -> bool {
        matches!(self.incident_type.as_str(), "card" | "yellow" | "yellowRed" | "red")
    }

    pub fn is_substitution(&self) -> bool {
        self.incident_type == "substitution"
    }

    pub fn is_period_marker(&self) -> bool {
        if self.incident_type == "period" {
            return true;
        }
        // legacy markers: type "Unknown", added_time 999
        self.incident_type == "Unknown" && self.added_time >= PERIOD_ADDED_TIME_SENTINEL
    }

    pub fn is_injury_time_announcement(&self) -> bool {
        self.incident_type == "injuryTime"
    }

    pub fn is_var_decision(&self) -> bool {
        self.incident_type == "varDecision"
    }

    /// "70+3" / "45" / "" (markers and announcements have no minute display).
    pub fn formatted_time(&self) -> String {
        if self.is_period_marker() || self.is_injury_time_announcement() {
            return String::new();
        }
        if self.added_time > 0 && self.added_time < PERIOD_ADDED_TIME_SENTINEL {
            return format!("{}+{}", self.time, self.added_time);
        }
        self.time.to_string()
    }

    pub fn running_score(&self) -> String {
        match (self.home_score, self.away_score) {
            (Some(h), Some(a)) => format!("{h} - {a}"),
            _ => String::new(),
        }
    }

    /// Human label for the subclass. Legacy goal rows have no subclass
    /// field, so the type field doubles as the source.
    pub fn incident_class_label(&self) -> &'static str {
        let source = match self.incident_class.as_deref() {
            Some(ic) if !ic.is_empty() => ic,
            _ if self.is_goal() => self.incident_type.as_str(),
            _ => return "",
        };
        match source {
            "ownGoal" => "own goal",
            "penalty" => "penalty",
            "missedPenalty" => "missed penalty",
            "penaltyNotAwarded" => "penalty not awarded",
            "yellowRed" => "second yellow",
            _ => "",
        }
    }

    /// "home" / "away", or "neutral" for markers not attributable to a side.
    pub fn side(&self) -> &'static str {
        if self.is_period_marker() || self.is_injury_time_announcement() {
            return "neutral";
        }
        if self.is_home_team {
            "home"
        } else {
            "away"
        }
    }

    /// Card color key, reading the subclass first and the legacy type field
    /// as fallback. Unrecognized sources (including plain "card") → yellow.
    pub fn card_color(&self) -> Option<&'static str> {
        if !self.is_card() {
            return None;
        }
        let source = self
            .incident_class
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.incident_type);
        Some(match source {
            "yellowRed" => "yellow-red",
            "red" => "red",
            _ => "yellow",
        })
    }

    /// Legacy substitutions stored the incoming player only in the generic
    /// player field.
    pub fn display_player_in(&self) -> &str {
        self.player_in_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.player_name.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or("")
    }

    pub fn display_player_out(&self) -> &str {
        self.player_out_name.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LineupEntry {
    pub id: i64,
    pub match_id: i64,
    pub player_name: String,
    pub player_api_id: Option<i64>,
    pub shirt_number: Option<i64>,
    /// G / D / M / F, or whatever else the feed sent.
    pub position: Option<String>,
    pub is_home_team: bool,
    pub is_starting_xi: bool,
    pub is_captain: bool,
    pub avg_rating: Option<String>,
}

impl LineupEntry {
    pub fn position_label(&self) -> &str {
        match self.position.as_deref() {
            Some("G") => "GK",
            Some("D") => "DEF",
            Some("M") => "MID",
            Some("F") => "FWD",
            Some(other) => other,
            None => "",
        }
    }

    pub fn is_goalkeeper(&self) -> bool {
        self.position.as_deref() == Some("G")
    }
}

/// Lineup entry before insertion (no local ids yet).
#[derive(Debug, Clone, Default)]
pub struct NewLineupEntry {
    pub player_name: String,
    pub player_api_id: Option<i64>,
    pub shirt_number: Option<i64>,
    pub position: Option<String>,
    pub is_home_team: bool,
    pub is_starting_xi: bool,
    pub is_captain: bool,
    pub avg_rating: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MissingPlayer {
    pub id: i64,
    pub match_id: i64,
    pub player_name: String,
    /// "missing" or "doubtful"
    pub kind: String,
    pub reason: Option<String>,
    pub is_home_team: bool,
}

#[derive(Debug, Clone)]
pub struct NewMissingPlayer {
    pub player_name: String,
    pub kind: String,
    pub reason: Option<String>,
    pub is_home_team: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(incident_type: &str) -> MatchEvent {
        MatchEvent {
            id: 1,
            match_id: 1,
            event_id: None,
            incident_type: incident_type.to_string(),
            incident_class: None,
            time: 10,
            added_time: 0,
            is_home_team: true,
            player_name: None,
            assist_player_name: None,
            assist2_player_name: None,
            player_in_name: None,
            player_out_name: None,
            injury: false,
            reason: None,
            rescinded: false,
            text: None,
            is_live: false,
            home_score: None,
            away_score: None,
            length: None,
            confirmed: None,
        }
    }

    #[test]
    fn goal_type_is_goal() {
        assert!(event("goal").is_goal());
    }

    #[test]
    fn legacy_goal_requires_real_player() {
        for legacy in ["regular", "penalty", "ownGoal"] {
            let mut e = event(legacy);
            e.player_name = Some("Messi".to_string());
            assert!(e.is_goal(), "{legacy} with player should be a goal");

            e.player_name = Some(UNKNOWN_PLAYER.to_string());
            assert!(!e.is_goal(), "{legacy} with sentinel player is not a goal");

            e.player_name = Some(String::new());
            assert!(!e.is_goal(), "{legacy} with empty player is not a goal");

            e.player_name = None;
            assert!(!e.is_goal());
        }
    }

    #[test]
    fn card_recognizes_both_conventions() {
        assert!(event("card").is_card());
        assert!(event("yellow").is_card());
        assert!(event("yellowRed").is_card());
        assert!(event("red").is_card());
        assert!(!event("goal").is_card());
    }

    #[test]
    fn legacy_period_marker_uses_added_time_sentinel() {
        let mut e = event("Unknown");
        e.added_time = 999;
        assert!(e.is_period_marker());

        e.added_time = 3;
        assert!(!e.is_period_marker());

        assert!(event("period").is_period_marker());
        // sentinel added_time on a recognized type does not make it a marker
        let mut g = event("goal");
        g.added_time = 999;
        assert!(!g.is_period_marker());
    }

    #[test]
    fn formatted_time_rules() {
        let mut e = event("goal");
        e.time = 70;
        e.added_time = 3;
        assert_eq!(e.formatted_time(), "70+3");

        e.added_time = 0;
        e.time = 45;
        assert_eq!(e.formatted_time(), "45");

        // legacy sentinel never leaks into the display
        let mut legacy = event("Unknown");
        legacy.time = 45;
        legacy.added_time = 999;
        assert_eq!(legacy.formatted_time(), "");

        let mut period = event("period");
        period.time = 90;
        assert_eq!(period.formatted_time(), "");

        let mut it = event("injuryTime");
        it.time = 45;
        assert_eq!(it.formatted_time(), "");
    }

    #[test]
    fn running_score_needs_both_sides() {
        let mut e = event("goal");
        assert_eq!(e.running_score(), "");
        e.home_score = Some(2);
        assert_eq!(e.running_score(), "");
        e.away_score = Some(1);
        assert_eq!(e.running_score(), "2 - 1");
    }

    #[test]
    fn class_label_prefers_subclass_then_legacy_type() {
        let mut e = event("goal");
        e.incident_class = Some("ownGoal".to_string());
        assert_eq!(e.incident_class_label(), "own goal");

        // legacy: subclass lives in the type field
        let mut legacy = event("penalty");
        legacy.player_name = Some("Kane".to_string());
        assert_eq!(legacy.incident_class_label(), "penalty");

        // non-goal without subclass has no label
        assert_eq!(event("card").incident_class_label(), "");

        let mut plain = event("goal");
        plain.incident_class = Some("regular".to_string());
        assert_eq!(plain.incident_class_label(), "");
    }

    #[test]
    fn side_is_neutral_for_markers() {
        assert_eq!(event("period").side(), "neutral");
        assert_eq!(event("injuryTime").side(), "neutral");

        let mut e = event("goal");
        assert_eq!(e.side(), "home");
        e.is_home_team = false;
        assert_eq!(e.side(), "away");
    }

    #[test]
    fn card_color_handles_both_conventions() {
        assert_eq!(event("goal").card_color(), None);

        let mut modern = event("card");
        modern.incident_class = Some("yellowRed".to_string());
        assert_eq!(modern.card_color(), Some("yellow-red"));

        modern.incident_class = Some("red".to_string());
        assert_eq!(modern.card_color(), Some("red"));

        // bare "card" row falls back to yellow
        modern.incident_class = None;
        assert_eq!(modern.card_color(), Some("yellow"));

        // legacy: color in the type field
        assert_eq!(event("yellow").card_color(), Some("yellow"));
        assert_eq!(event("yellowRed").card_color(), Some("yellow-red"));
        assert_eq!(event("red").card_color(), Some("red"));
    }

    #[test]
    fn display_players_fall_back_like_legacy_rows() {
        let mut e = event("substitution");
        e.player_name = Some("Pedri".to_string());
        assert_eq!(e.display_player_in(), "Pedri");
        assert_eq!(e.display_player_out(), "");

        e.player_in_name = Some("Gavi".to_string());
        e.player_out_name = Some("Pedri".to_string());
        assert_eq!(e.display_player_in(), "Gavi");
        assert_eq!(e.display_player_out(), "Pedri");
    }

    #[test]
    fn lineup_position_helpers() {
        let mut entry = LineupEntry {
            id: 1,
            match_id: 1,
            player_name: "Neuer".to_string(),
            player_api_id: None,
            shirt_number: Some(1),
            position: Some("G".to_string()),
            is_home_team: true,
            is_starting_xi: true,
            is_captain: true,
            avg_rating: None,
        };
        assert!(entry.is_goalkeeper());
        assert_eq!(entry.position_label(), "GK");

        entry.position = Some("D".to_string());
        assert!(!entry.is_goalkeeper());
        assert_eq!(entry.position_label(), "DEF");

        entry.position = Some("ST".to_string());
        assert_eq!(entry.position_label(), "ST");

        entry.position = None;
        assert_eq!(entry.position_label(), "");
    }
}
