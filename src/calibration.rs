use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];

    /// Parses a full-time result code (`H`, `D`, `A`).
    pub fn from_code(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "H" => Some(Outcome::Home),
            "D" => Some(Outcome::Draw),
            "A" => Some(Outcome::Away),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Outcome::Home => "H",
            Outcome::Draw => "D",
            Outcome::Away => "A",
        }
    }

    /// Actual score of the home side: 1 for a win, 0.5 for a draw, 0 for a loss.
    pub fn home_score(self) -> f64 {
        match self {
            Outcome::Home => 1.0,
            Outcome::Draw => 0.5,
            Outcome::Away => 0.0,
        }
    }

    /// League points awarded as `(home, away)`.
    pub fn points(self) -> (u32, u32) {
        match self {
            Outcome::Home => (3, 0),
            Outcome::Draw => (1, 1),
            Outcome::Away => (0, 3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prob3 {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct CalibrationBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub avg_pred: f64,
    pub actual_rate: f64,
}

impl Prob3 {
    pub fn uniform() -> Self {
        Self {
            home: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away: 1.0 / 3.0,
        }
    }

    pub fn of(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    /// Rescales to sum to one; a zero mass falls back to uniform.
    pub fn normalized(self) -> Self {
        let home = self.home.max(0.0);
        let draw = self.draw.max(0.0);
        let away = self.away.max(0.0);
        let total = home + draw + away;
        if total <= 0.0 || !total.is_finite() {
            return Self::uniform();
        }
        Self {
            home: home / total,
            draw: draw / total,
            away: away / total,
        }
    }

    /// Highest-probability outcome; ties favour home, then draw.
    pub fn most_likely(&self) -> Outcome {
        if self.home >= self.draw && self.home >= self.away {
            Outcome::Home
        } else if self.draw >= self.away {
            Outcome::Draw
        } else {
            Outcome::Away
        }
    }
}

pub fn classify_outcome(home_goals: i32, away_goals: i32) -> Outcome {
    match home_goals.cmp(&away_goals) {
        std::cmp::Ordering::Greater => Outcome::Home,
        std::cmp::Ordering::Less => Outcome::Away,
        std::cmp::Ordering::Equal => Outcome::Draw,
    }
}

/// Observed result frequencies; uniform when there is nothing to count.
pub fn empirical_outcome_probs(outcomes: &[Outcome]) -> Prob3 {
    if outcomes.is_empty() {
        return Prob3::uniform();
    }
    let n = outcomes.len() as f64;
    let share = |o: Outcome| outcomes.iter().filter(|x| **x == o).count() as f64 / n;
    Prob3 {
        home: share(Outcome::Home),
        draw: share(Outcome::Draw),
        away: share(Outcome::Away),
    }
}

/// Mean Brier score, log-loss and top-pick accuracy; zeroed when the slices do not line up.
pub fn evaluate_probs(predictions: &[Prob3], outcomes: &[Outcome]) -> Metrics {
    if predictions.is_empty() || predictions.len() != outcomes.len() {
        return Metrics {
            samples: 0,
            brier: 0.0,
            log_loss: 0.0,
            accuracy: 0.0,
        };
    }

    let (mut brier, mut log_loss, mut hits) = (0.0_f64, 0.0_f64, 0usize);
    for (p, &actual) in predictions.iter().zip(outcomes) {
        brier += Outcome::ALL
            .iter()
            .map(|&o| {
                let target = if o == actual { 1.0 } else { 0.0 };
                (p.of(o) - target).powi(2)
            })
            .sum::<f64>();
        log_loss -= p.of(actual).clamp(1e-12, 1.0).ln();
        if p.most_likely() == actual {
            hits += 1;
        }
    }

    let n = predictions.len() as f64;
    Metrics {
        samples: predictions.len(),
        brier: brier / n,
        log_loss: log_loss / n,
        accuracy: hits as f64 / n,
    }
}

/// Reliability table for one outcome over `bins` equal-width probability buckets.
pub fn calibration_bins(
    predictions: &[Prob3],
    outcomes: &[Outcome],
    class: Outcome,
    bins: usize,
) -> Vec<CalibrationBin> {
    let bins = bins.max(2);
    let width = 1.0 / bins as f64;
    let mut table: Vec<CalibrationBin> = (0..bins)
        .map(|i| CalibrationBin {
            bucket_start: i as f64 * width,
            bucket_end: (i + 1) as f64 * width,
            count: 0,
            avg_pred: 0.0,
            actual_rate: 0.0,
        })
        .collect();

    // accumulate sums first, divide once at the end
    for (p, outcome) in predictions.iter().zip(outcomes) {
        let prob = p.of(class).clamp(0.0, 1.0);
        let bin = &mut table[((prob / width) as usize).min(bins - 1)];
        bin.count += 1;
        bin.avg_pred += prob;
        if *outcome == class {
            bin.actual_rate += 1.0;
        }
    }
    for bin in table.iter_mut().filter(|b| b.count > 0) {
        bin.avg_pred /= bin.count as f64;
        bin.actual_rate /= bin.count as f64;
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_codes_parse_case_insensitively() {
        assert_eq!(Outcome::from_code("h"), Some(Outcome::Home));
        assert_eq!(Outcome::from_code(" D "), Some(Outcome::Draw));
        assert_eq!(Outcome::from_code("A"), Some(Outcome::Away));
        assert_eq!(Outcome::from_code(""), None);
        assert_eq!(Outcome::from_code("X"), None);
    }

    #[test]
    fn points_follow_three_one_zero() {
        assert_eq!(Outcome::Home.points(), (3, 0));
        assert_eq!(Outcome::Draw.points(), (1, 1));
        assert_eq!(Outcome::Away.points(), (0, 3));
    }

    #[test]
    fn perfect_predictions_score_zero_brier() {
        let preds = vec![
            Prob3 {
                home: 1.0,
                draw: 0.0,
                away: 0.0,
            },
            Prob3 {
                home: 0.0,
                draw: 0.0,
                away: 1.0,
            },
        ];
        let m = evaluate_probs(&preds, &[Outcome::Home, Outcome::Away]);
        assert_eq!(m.samples, 2);
        assert!(m.brier.abs() < 1e-12);
        assert!((m.accuracy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn normalized_handles_zero_mass() {
        let p = Prob3 {
            home: 0.0,
            draw: 0.0,
            away: 0.0,
        }
        .normalized();
        assert!((p.home - 1.0 / 3.0).abs() < 1e-12);

        let q = Prob3 {
            home: 2.0,
            draw: 1.0,
            away: 1.0,
        }
        .normalized();
        assert!((q.home - 0.5).abs() < 1e-12);
        assert!((q.home + q.draw + q.away - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empirical_probs_count_results() {
        let p = empirical_outcome_probs(&[Outcome::Home, Outcome::Home, Outcome::Draw, Outcome::Away]);
        assert!((p.home - 0.5).abs() < 1e-12);
        assert!((p.draw - 0.25).abs() < 1e-12);
        assert_eq!(empirical_outcome_probs(&[]), Prob3::uniform());
    }

    #[test]
    fn calibration_bins_average_within_bucket() {
        let preds = [
            Prob3 { home: 0.62, draw: 0.2, away: 0.18 },
            Prob3 { home: 0.68, draw: 0.2, away: 0.12 },
            Prob3 { home: 1.0, draw: 0.0, away: 0.0 },
        ];
        let outcomes = [Outcome::Home, Outcome::Away, Outcome::Home];
        let bins = calibration_bins(&preds, &outcomes, Outcome::Home, 10);
        assert_eq!(bins.len(), 10);
        assert_eq!(bins[6].count, 2);
        assert!((bins[6].avg_pred - 0.65).abs() < 1e-12);
        assert!((bins[6].actual_rate - 0.5).abs() < 1e-12);
        assert_eq!(bins[9].count, 1);
        assert_eq!(bins[0].count, 0);
    }

    #[test]
    fn mismatched_lengths_score_nothing() {
        let m = evaluate_probs(&[Prob3::uniform()], &[]);
        assert_eq!(m.samples, 0);
    }
}
