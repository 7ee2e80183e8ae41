//! Rolling form: the mean of a team's own last few stat lines.
//!
//! One buffer per team regardless of venue. A snapshot only exists when every
//! tracked value has at least one present entry in the window.

use std::collections::{HashMap, VecDeque};

use crate::historical_dataset::{TEAM_STAT_WIDTH, TeamStatLine};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormSnapshot {
    pub means: [f64; TEAM_STAT_WIDTH],
    /// Matches in the window the means were taken over.
    pub matches: usize,
}

#[derive(Debug, Clone)]
pub struct FormTracker {
    capacity: usize,
    buffers: HashMap<String, VecDeque<TeamStatLine>>,
}

impl FormTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            buffers: HashMap::new(),
        }
    }

    /// Rolling mean over the team's completed matches, or `None` without usable history.
    pub fn observe(&self, team: &str) -> Option<FormSnapshot> {
        let buffer = self.buffers.get(team)?;
        if buffer.is_empty() {
            return None;
        }

        let mut means = [0.0_f64; TEAM_STAT_WIDTH];
        for (idx, mean) in means.iter_mut().enumerate() {
            let mut sum = 0.0;
            let mut n = 0usize;
            for value in buffer.iter().filter_map(|line| line.0[idx]) {
                sum += value;
                n += 1;
            }
            if n == 0 {
                return None;
            }
            *mean = sum / n as f64;
        }

        Some(FormSnapshot {
            means,
            matches: buffer.len(),
        })
    }

    /// Appends the team's line from the match just played, evicting the oldest on overflow.
    pub fn record(&mut self, team: &str, line: TeamStatLine) {
        let capacity = self.capacity;
        let buffer = self
            .buffers
            .entry(team.to_string())
            .or_insert_with(|| VecDeque::with_capacity(capacity));
        if buffer.len() == capacity {
            buffer.pop_front();
        }
        buffer.push_back(line);
    }

    pub fn history_len(&self, team: &str) -> usize {
        self.buffers.get(team).map_or(0, VecDeque::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(v: f64) -> TeamStatLine {
        TeamStatLine([Some(v); TEAM_STAT_WIDTH])
    }

    #[test]
    fn unknown_team_has_no_form() {
        let form = FormTracker::new(5);
        assert!(form.observe("Nobody").is_none());
        assert_eq!(form.history_len("Nobody"), 0);
    }

    #[test]
    fn window_is_bounded_and_evicts_oldest() {
        let mut form = FormTracker::new(5);
        for v in 1..=7 {
            form.record("A", line(v as f64));
            assert!(form.history_len("A") <= 5);
        }
        let snap = form.observe("A").unwrap();
        assert_eq!(snap.matches, 5);
        // 3..=7
        assert!((snap.means[0] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn mean_skips_missing_values() {
        let mut form = FormTracker::new(5);
        let mut partial = line(4.0);
        partial.0[3] = None;
        form.record("A", line(2.0));
        form.record("A", partial);
        let snap = form.observe("A").unwrap();
        assert!((snap.means[0] - 3.0).abs() < 1e-12);
        assert!((snap.means[3] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn value_missing_across_window_means_no_snapshot() {
        let mut form = FormTracker::new(5);
        let mut partial = line(1.0);
        partial.0[7] = None;
        form.record("A", partial);
        assert!(form.observe("A").is_none());
    }
}
