use std::collections::HashMap;

use crate::calibration::Outcome;
use crate::historical_dataset::MatchEvent;

#[derive(Debug, Clone, Copy)]
pub struct EloConfig {
    pub k: f64,
    pub initial: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            k: 30.0,
            initial: 1500.0,
        }
    }
}

/// Rating changes applied by one match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EloDelta {
    pub home: f64,
    pub away: f64,
}

#[derive(Debug, Clone)]
pub struct EloRatings {
    ratings: HashMap<String, f64>,
    cfg: EloConfig,
}

impl Default for EloRatings {
    fn default() -> Self {
        Self::new(EloConfig::default())
    }
}

impl EloRatings {
    pub fn new(cfg: EloConfig) -> Self {
        Self {
            ratings: HashMap::new(),
            cfg,
        }
    }

    pub fn rating(&self, team: &str) -> f64 {
        self.ratings.get(team).copied().unwrap_or(self.cfg.initial)
    }

    /// Both deltas come from the same pre-match snapshot, so they cancel out.
    pub fn update(&mut self, home: &str, away: &str, outcome: Outcome) -> EloDelta {
        let r_home = self.rating(home);
        let r_away = self.rating(away);

        let expected_home = expected_score(r_home, r_away);
        let delta = self.cfg.k * (outcome.home_score() - expected_home);

        self.ratings.insert(home.to_string(), r_home + delta);
        self.ratings.insert(away.to_string(), r_away - delta);
        EloDelta {
            home: delta,
            away: -delta,
        }
    }

    pub fn teams(&self) -> usize {
        self.ratings.len()
    }
}

pub fn compute_elo_for_events(events: &[MatchEvent], cfg: EloConfig) -> EloRatings {
    let mut elo = EloRatings::new(cfg);
    for m in events {
        elo.update(&m.home_team, &m.away_team, m.outcome);
    }
    elo
}

pub fn expected_score(r_a: f64, r_b: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf((r_b - r_a) / 400.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_team_starts_at_initial() {
        let elo = EloRatings::default();
        assert_eq!(elo.rating("Anyone"), 1500.0);
        assert_eq!(elo.teams(), 0);
    }

    #[test]
    fn expected_scores_are_complementary() {
        for (a, b) in [(1500.0, 1500.0), (1720.5, 1388.0), (1200.0, 1900.0)] {
            let sum = expected_score(a, b) + expected_score(b, a);
            assert!((sum - 1.0).abs() < 1e-12);
        }
        assert!((expected_score(1500.0, 1500.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn equal_teams_home_win_moves_half_k() {
        let mut elo = EloRatings::default();
        let d = elo.update("A", "B", Outcome::Home);
        assert!((d.home - 15.0).abs() < 1e-12);
        assert!((elo.rating("A") - 1515.0).abs() < 1e-12);
        assert!((elo.rating("B") - 1485.0).abs() < 1e-12);
    }

    #[test]
    fn updates_are_zero_sum() {
        let mut elo = EloRatings::default();
        let results = [Outcome::Home, Outcome::Draw, Outcome::Away, Outcome::Home];
        for (i, outcome) in results.iter().enumerate() {
            let (h, a) = if i % 2 == 0 { ("A", "B") } else { ("B", "C") };
            let d = elo.update(h, a, *outcome);
            assert!((d.home + d.away).abs() < 1e-12);
        }
        let total = elo.rating("A") + elo.rating("B") + elo.rating("C");
        assert!((total - 4500.0).abs() < 1e-9);
    }

    #[test]
    fn underdog_draw_gains_rating() {
        let mut elo = EloRatings::default();
        for _ in 0..3 {
            elo.update("Strong", "Weak", Outcome::Home);
        }
        let before = elo.rating("Weak");
        elo.update("Strong", "Weak", Outcome::Draw);
        assert!(elo.rating("Weak") > before);
    }
}
