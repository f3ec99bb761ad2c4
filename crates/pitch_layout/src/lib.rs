//! MatchdayLive — pitch layout
//!
//! Places a starting XI onto a 2D pitch surface as (top%, left%) pairs.
//! Rows follow the formation descriptor ("4-3-3"): row 0 is the keeper,
//! then one row per outfield group. The home side scans left% 5→45, the
//! away side mirrors 95→55, so both XIs attack toward the middle.
//!
//! The formation is a display heuristic, not a source of truth: a
//! missing or broken descriptor falls back to counting position buckets,
//! and a descriptor that disagrees with the player count is tolerated.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

/// Input row: the fields of a lineup entry the layout cares about.
#[derive(Debug, Clone, Default)]
pub struct PitchPlayer {
    pub name: String,
    pub shirt_number: Option<i64>,
    /// Position code: G / D / M / F. Anything else plays midfield.
    pub position: Option<String>,
    pub avg_rating: Option<String>,
}

/// One placed player, percentages relative to the pitch surface.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedPlayer {
    pub name: String,
    pub shirt_number: Option<i64>,
    pub top_pct: f64,
    pub left_pct: f64,
    pub rating_class: Option<&'static str>,
}

const HOME_SCAN: (f64, f64) = (5.0, 45.0);
const AWAY_SCAN: (f64, f64) = (95.0, 55.0);

/// "4-3-3" → [4, 3, 3]. None when the descriptor is unusable.
fn parse_formation(descriptor: &str) -> Option<Vec<usize>> {
    let rows: Option<Vec<usize>> =
        descriptor.split('-').map(|part| part.trim().parse().ok()).collect();
    rows.filter(|r| !r.is_empty() && r.iter().any(|&n| n > 0))
}

fn bucket(player: &PitchPlayer) -> char {
    match player.position.as_deref() {
        Some("G") => 'G',
        Some("D") => 'D',
        Some("F") => 'F',
        // unrecognized outfield positions play midfield
        _ => 'M',
    }
}

/// Fallback shape from declared position buckets; [4, 4, 2] when even that
/// is empty. Only explicit D/M/F codes count here; unrecognized positions
/// join the midfield walk but say nothing about the shape.
fn formation_from_buckets(players: &[PitchPlayer]) -> Vec<usize> {
    let mut counts = [0usize; 3]; // D, M, F
    for p in players {
        match p.position.as_deref() {
            Some("D") => counts[0] += 1,
            Some("M") => counts[1] += 1,
            Some("F") => counts[2] += 1,
            _ => {}
        }
    }
    let rows: Vec<usize> = counts.into_iter().filter(|&n| n > 0).collect();
    if rows.is_empty() {
        vec![4, 4, 2]
    } else {
        rows
    }
}

fn rating_class(avg_rating: Option<&str>) -> Option<&'static str> {
    let raw = avg_rating?.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<f64>() {
        Ok(r) if r >= 7.0 => Some("rating-positive"),
        Ok(r) if r >= 6.0 => Some("rating-neutral"),
        Ok(_) => Some("rating-negative"),
        Err(_) => Some("rating-neutral"),
    }
}

/// Lays out one side's starting XI. Deterministic: same inputs, same
/// coordinates.
pub fn layout_side(
    formation: Option<&str>,
    players: &[PitchPlayer],
    side: Side,
) -> Vec<PlacedPlayer> {
    let shape = formation
        .and_then(parse_formation)
        .unwrap_or_else(|| formation_from_buckets(players));

    let keepers: Vec<&PitchPlayer> = players.iter().filter(|p| bucket(p) == 'G').collect();

    // outfield walk order: defenders, midfielders (incl. unrecognized), forwards
    let mut outfield: Vec<&PitchPlayer> = Vec::new();
    for wanted in ['D', 'M', 'F'] {
        outfield.extend(players.iter().filter(|p| bucket(p) == wanted));
    }

    let mut rows: Vec<Vec<&PitchPlayer>> = vec![keepers];
    let mut cursor = 0;
    for size in shape {
        let end = (cursor + size).min(outfield.len());
        rows.push(outfield[cursor..end].to_vec());
        cursor = end;
    }
    rows.retain(|row| !row.is_empty());

    let (start, end) = match side {
        Side::Home => HOME_SCAN,
        Side::Away => AWAY_SCAN,
    };
    let step = if rows.len() > 1 { (end - start) / (rows.len() as f64 - 1.0) } else { 0.0 };

    let mut placed = Vec::new();
    for (row_index, row) in rows.iter().enumerate() {
        let left_pct = start + step * row_index as f64;
        let count = row.len();
        for (k, player) in row.iter().enumerate() {
            // k/(n+1) keeps players inside the row, away from the touchlines
            let top_pct = (k + 1) as f64 / (count + 1) as f64 * 100.0;
            placed.push(PlacedPlayer {
                name: player.name.clone(),
                shirt_number: player.shirt_number,
                top_pct,
                left_pct,
                rating_class: rating_class(player.avg_rating.as_deref()),
            });
        }
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str, position: &str) -> PitchPlayer {
        PitchPlayer {
            name: name.to_string(),
            position: Some(position.to_string()),
            ..PitchPlayer::default()
        }
    }

    /// 1 keeper + 4 defenders + 3 midfielders + 3 forwards.
    fn eleven() -> Vec<PitchPlayer> {
        let mut squad = vec![player("GK", "G")];
        for i in 0..4 {
            squad.push(player(&format!("D{i}"), "D"));
        }
        for i in 0..3 {
            squad.push(player(&format!("M{i}"), "M"));
        }
        for i in 0..3 {
            squad.push(player(&format!("F{i}"), "F"));
        }
        squad
    }

    #[test]
    fn four_three_three_places_all_eleven() {
        let placed = layout_side(Some("4-3-3"), &eleven(), Side::Home);
        assert_eq!(placed.len(), 11);

        // keeper row anchored near the left edge
        let keeper = placed.iter().find(|p| p.name == "GK").unwrap();
        assert!((keeper.left_pct - 5.0).abs() < f64::EPSILON);

        // rows scan strictly toward 45
        let mut lefts: Vec<f64> = placed.iter().map(|p| p.left_pct).collect();
        lefts.dedup();
        assert_eq!(lefts.len(), 4);
        assert!(lefts.windows(2).all(|w| w[0] < w[1]));
        assert!((lefts[3] - 45.0).abs() < 1e-9);
    }

    #[test]
    fn away_side_is_mirrored() {
        let placed = layout_side(Some("4-3-3"), &eleven(), Side::Away);
        let keeper = placed.iter().find(|p| p.name == "GK").unwrap();
        assert!((keeper.left_pct - 95.0).abs() < f64::EPSILON);

        let mut lefts: Vec<f64> = placed.iter().map(|p| p.left_pct).collect();
        lefts.dedup();
        assert!(lefts.windows(2).all(|w| w[0] > w[1]));
        assert!((lefts[3] - 55.0).abs() < 1e-9);
    }

    #[test]
    fn players_spread_within_a_row() {
        let placed = layout_side(Some("4-3-3"), &eleven(), Side::Home);

        let defenders: Vec<&PlacedPlayer> =
            placed.iter().filter(|p| p.name.starts_with('D')).collect();
        assert_eq!(defenders.len(), 4);
        for (k, d) in defenders.iter().enumerate() {
            let expected = (k + 1) as f64 / 5.0 * 100.0;
            assert!((d.top_pct - expected).abs() < 1e-9);
        }

        // lone keeper sits centered
        let keeper = placed.iter().find(|p| p.name == "GK").unwrap();
        assert!((keeper.top_pct - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_formation_falls_back_to_buckets() {
        let placed = layout_side(None, &eleven(), Side::Home);
        assert_eq!(placed.len(), 11);
        let mut lefts: Vec<f64> = placed.iter().map(|p| p.left_pct).collect();
        lefts.dedup();
        // keeper + D/M/F rows
        assert_eq!(lefts.len(), 4);
    }

    #[test]
    fn malformed_formation_falls_back_to_buckets() {
        let placed = layout_side(Some("four-four-two"), &eleven(), Side::Home);
        assert_eq!(placed.len(), 11);
    }

    #[test]
    fn no_positions_at_all_defaults_to_four_four_two() {
        let squad: Vec<PitchPlayer> = Vec::new();
        assert!(layout_side(None, &squad, Side::Home).is_empty());

        // ten unknown-position players: fold into midfield, chunked 4-4-2
        let squad: Vec<PitchPlayer> =
            (0..10).map(|i| PitchPlayer { name: format!("P{i}"), ..PitchPlayer::default() }).collect();
        let placed = layout_side(None, &squad, Side::Home);
        assert_eq!(placed.len(), 10);
        let mut lefts: Vec<f64> = placed.iter().map(|p| p.left_pct).collect();
        lefts.dedup();
        assert_eq!(lefts.len(), 3);
    }

    #[test]
    fn short_trailing_rows_are_tolerated() {
        // formation asks for more players than exist: 4-4-2 over 6 outfielders
        let mut squad = vec![player("GK", "G")];
        for i in 0..6 {
            squad.push(player(&format!("D{i}"), "D"));
        }
        let placed = layout_side(Some("4-4-2"), &squad, Side::Home);
        // keeper + 4 + 2; the empty third row is skipped
        assert_eq!(placed.len(), 7);
        let mut lefts: Vec<f64> = placed.iter().map(|p| p.left_pct).collect();
        lefts.dedup();
        assert_eq!(lefts.len(), 3);
    }

    #[test]
    fn rating_bands() {
        assert_eq!(rating_class(Some("7.5")), Some("rating-positive"));
        assert_eq!(rating_class(Some("7.0")), Some("rating-positive"));
        assert_eq!(rating_class(Some("6.2")), Some("rating-neutral"));
        assert_eq!(rating_class(Some("4.0")), Some("rating-negative"));
        assert_eq!(rating_class(Some("n/a")), Some("rating-neutral"));
        assert_eq!(rating_class(Some("")), None);
        assert_eq!(rating_class(None), None);
    }
}
