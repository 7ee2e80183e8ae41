use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::calibration::Outcome;
use crate::historical_dataset::MatchEvent;

/// Venue-independent outcome rates between two teams, from `a`'s point of view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct H2hRates {
    pub a_win_rate: f64,
    pub b_win_rate: f64,
    pub draw_rate: f64,
    pub meetings: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum H2h {
    /// The two teams have never met; callers must take the strength-only path.
    NoHistory,
    Rates(H2hRates),
}

impl H2h {
    pub fn rates(&self) -> Option<&H2hRates> {
        match self {
            H2h::NoHistory => None,
            H2h::Rates(r) => Some(r),
        }
    }

    fn from_counts(a_wins: u32, b_wins: u32, draws: u32) -> Self {
        let meetings = a_wins + b_wins + draws;
        if meetings == 0 {
            return H2h::NoHistory;
        }
        let n = meetings as f64;
        let a_win_rate = a_wins as f64 / n;
        let b_win_rate = b_wins as f64 / n;
        // complement keeps a + b + draw at exactly 1.0
        let draw_rate = 1.0 - (a_win_rate + b_win_rate);
        H2h::Rates(H2hRates {
            a_win_rate,
            b_win_rate,
            draw_rate,
            meetings,
        })
    }
}

/// Tallies keyed by the lexicographically smaller team name.
#[derive(Debug, Clone, Copy, Default)]
struct PairRecord {
    first_wins: u32,
    second_wins: u32,
    draws: u32,
}

/// Incrementally maintained head-to-head counters for every unordered pair.
#[derive(Debug, Clone, Default)]
pub struct HeadToHead {
    pairs: HashMap<String, HashMap<String, PairRecord>>,
}

impl HeadToHead {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rates over every meeting recorded so far.
    pub fn h2h(&self, team_a: &str, team_b: &str) -> H2h {
        let (first, second) = ordered(team_a, team_b);
        let Some(record) = self.pairs.get(first).and_then(|m| m.get(second)) else {
            return H2h::NoHistory;
        };
        if first == team_a {
            H2h::from_counts(record.first_wins, record.second_wins, record.draws)
        } else {
            H2h::from_counts(record.second_wins, record.first_wins, record.draws)
        }
    }

    pub fn record(&mut self, home: &str, away: &str, outcome: Outcome) {
        let (first, second) = ordered(home, away);
        let record = self
            .pairs
            .entry(first.to_string())
            .or_default()
            .entry(second.to_string())
            .or_default();
        let home_is_first = first == home;
        match (outcome, home_is_first) {
            (Outcome::Draw, _) => record.draws += 1,
            (Outcome::Home, true) | (Outcome::Away, false) => record.first_wins += 1,
            (Outcome::Home, false) | (Outcome::Away, true) => record.second_wins += 1,
        }
    }
}

/// Reference computation: rescans `history` for meetings dated strictly before `as_of`.
pub fn scan_head_to_head(history: &[MatchEvent], team_a: &str, team_b: &str, as_of: NaiveDate) -> H2h {
    let mut a_wins = 0u32;
    let mut b_wins = 0u32;
    let mut draws = 0u32;
    for m in history.iter().filter(|m| m.date < as_of) {
        let a_home = m.home_team == team_a && m.away_team == team_b;
        let b_home = m.home_team == team_b && m.away_team == team_a;
        if !a_home && !b_home {
            continue;
        }
        match (m.outcome, a_home) {
            (Outcome::Draw, _) => draws += 1,
            (Outcome::Home, true) | (Outcome::Away, false) => a_wins += 1,
            (Outcome::Home, false) | (Outcome::Away, true) => b_wins += 1,
        }
    }
    H2h::from_counts(a_wins, b_wins, draws)
}

fn ordered<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}
