/// MatchdayLive — match view
///
/// Read-side inspection for one stored match: the event timeline rendered
/// through the derived views, plus both starting XIs placed on the pitch.
/// Local DB only, no API calls.
///
/// Usage:
///   match-view <local_match_id>

use anyhow::{Context, Result};
use dotenv::dotenv;
use match_store::{LineupEntry, MatchStore};
use pitch_layout::{layout_side, PitchPlayer, Side};

fn pitch_player(entry: &LineupEntry) -> PitchPlayer {
    PitchPlayer {
        name: entry.player_name.clone(),
        shirt_number: entry.shirt_number,
        position: entry.position.clone(),
        avg_rating: entry.avg_rating.clone(),
    }
}

fn main() -> Result<()> {
    dotenv().ok();

    let id: i64 = std::env::args()
        .nth(1)
        .context("usage: match-view <local_match_id>")?
        .parse()
        .context("invalid match id")?;

    let db_path = std::env::var("MATCH_DB_PATH").unwrap_or_else(|_| "data/matches.db".to_string());
    let store = MatchStore::open(&db_path)?;

    let m = store.match_by_local_id(id)?.with_context(|| format!("match {id} not found"))?;

    let team_name = |team_id: Option<i64>| -> String {
        team_id
            .and_then(|tid| store.team_by_local_id(tid).ok().flatten())
            .map(|t| t.name)
            .unwrap_or_else(|| "?".to_string())
    };

    println!(
        "{} {} - {} {}  [{}]",
        team_name(m.home_team_id),
        m.home_score,
        m.away_score,
        team_name(m.away_team_id),
        m.status
    );
    if let Some(league) = m.league_id.and_then(|lid| store.league_by_local_id(lid).ok().flatten()) {
        println!("{} ({})", league.name, league.country.as_deref().unwrap_or("Other"));
    }

    println!("\nTimeline:");
    for e in store.events_for_match(id)? {
        let minute = e.formatted_time();
        let player = e.player_name.as_deref().unwrap_or("");

        if e.is_period_marker() {
            println!("  ==== {} {} ====", e.text.as_deref().unwrap_or(""), e.running_score());
        } else if e.is_injury_time_announcement() {
            println!("  ++ {} min added", e.length.unwrap_or(0));
        } else if e.is_goal() {
            let label = e.incident_class_label();
            let suffix = if label.is_empty() { String::new() } else { format!(" ({label})") };
            println!("  {minute}' GOAL [{}] {}{} {}", e.side(), player, suffix, e.running_score());
        } else if e.is_card() {
            println!(
                "  {minute}' CARD [{}] {} ({})",
                e.side(),
                player,
                e.card_color().unwrap_or("yellow")
            );
        } else if e.is_substitution() {
            println!(
                "  {minute}' SUB [{}] {} -> {}",
                e.side(),
                e.display_player_out(),
                e.display_player_in()
            );
        } else if e.is_var_decision() {
            let verdict = match e.confirmed {
                Some(true) => "confirmed",
                Some(false) => "overturned",
                None => "pending",
            };
            println!("  {minute}' VAR [{}] {} ({verdict})", e.side(), player);
        } else {
            println!("  {minute}' {} {}", e.incident_type, player);
        }
    }

    for (label, is_home, formation, side) in [
        ("Home", true, m.home_formation.as_deref(), Side::Home),
        ("Away", false, m.away_formation.as_deref(), Side::Away),
    ] {
        let xi = store.lineups_for_match(id, is_home, true)?;
        let players: Vec<PitchPlayer> = xi.iter().map(pitch_player).collect();

        println!("\n{label} XI ({}):", formation.unwrap_or("?"));
        for p in layout_side(formation, &players, side) {
            let shirt = p.shirt_number.map(|n| n.to_string()).unwrap_or_default();
            println!(
                "  left {:>5.1}%  top {:>5.1}%  #{:<3} {} {}",
                p.left_pct,
                p.top_pct,
                shirt,
                p.name,
                p.rating_class.unwrap_or("")
            );
        }

        let bench = store.lineups_for_match(id, is_home, false)?;
        if !bench.is_empty() {
            let names: Vec<String> = bench
                .iter()
                .map(|e| format!("{} ({})", e.player_name, e.position_label()))
                .collect();
            println!("  bench: {}", names.join(", "));
        }
    }

    let missing = store.missing_players_for_match(id)?;
    if !missing.is_empty() {
        println!("\nMissing / doubtful:");
        for p in missing {
            let side = if p.is_home_team { "home" } else { "away" };
            println!(
                "  [{}] {} ({}{})",
                side,
                p.player_name,
                p.kind,
                p.reason.as_deref().map(|r| format!(", reason {r}")).unwrap_or_default()
            );
        }
    }

    Ok(())
}
