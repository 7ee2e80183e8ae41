#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use league_features::calibration::classify_outcome;
use league_features::historical_dataset::{MatchEvent, OddsAverages, STAT_KINDS, SideStats};

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn team_names(teams: usize) -> Vec<String> {
    (0..teams).map(|i| format!("Team {i:02}")).collect()
}

/// Full stat line with goals as given and the rest derived from them.
pub fn side(goals: u32, ht_goals: u32, shots: u32) -> SideStats {
    let g = goals as f64;
    [
        Some(g),
        Some(ht_goals as f64),
        Some(shots as f64),
        Some((shots / 2) as f64),
        Some(10.0 + g),
        Some(4.0 + g),
        Some(2.0),
        Some(0.0),
    ]
}

pub fn result_event(
    seq: usize,
    date: NaiveDate,
    home: &str,
    away: &str,
    home_goals: u32,
    away_goals: u32,
) -> MatchEvent {
    MatchEvent {
        seq,
        date,
        home_team: home.to_string(),
        away_team: away.to_string(),
        outcome: classify_outcome(home_goals as i32, away_goals as i32),
        home_stats: side(home_goals, home_goals.min(1), 8 + 3 * home_goals),
        away_stats: side(away_goals, away_goals.min(1), 6 + 3 * away_goals),
        odds: OddsAverages::default(),
    }
}

/// Double round robin per season with random results and a few matches per date.
///
/// Dates are non-decreasing and several fixtures share each date, so a team
/// can appear twice on one date.
pub fn synthetic_league(seed: u64, teams: usize, seasons: usize) -> Vec<MatchEvent> {
    let mut rng = StdRng::seed_from_u64(seed);
    let names = team_names(teams);
    let per_date = (teams / 2).max(1);
    let mut events = Vec::new();

    for season in 0..seasons {
        let start = ymd(2015 + season as i32, 8, 10);
        let mut pairs: Vec<(usize, usize)> = (0..teams)
            .flat_map(|h| (0..teams).filter(move |&a| a != h).map(move |a| (h, a)))
            .collect();
        pairs.shuffle(&mut rng);

        for (idx, (h, a)) in pairs.into_iter().enumerate() {
            let date = start + Duration::days(2 * (idx / per_date) as i64);
            let mut event = result_event(
                events.len(),
                date,
                &names[h],
                &names[a],
                rng.gen_range(0..4),
                rng.gen_range(0..3),
            );
            if rng.gen_range(0..10) > 0 {
                let home = rng.gen_range(1.4..4.5);
                event.odds = OddsAverages {
                    home: Some(home),
                    draw: Some(rng.gen_range(3.0..4.0)),
                    away: Some(6.0 - home),
                };
            }
            if rng.gen_range(0..25) == 0 {
                event.home_stats[rng.gen_range(0..STAT_KINDS)] = None;
            }
            events.push(event);
        }
    }
    events
}
