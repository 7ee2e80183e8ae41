//! Season-scoped points tables and as-of-kickoff league rank.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::calibration::Outcome;

/// First month of a season; earlier months belong to the season that started the year before.
pub const SEASON_START_MONTH: u32 = 8;

/// `"{Y}-{Y+1}"` for the August–July season containing `date`.
pub fn season_key(date: NaiveDate) -> String {
    let year = date.year();
    if date.month() >= SEASON_START_MONTH {
        format!("{}-{}", year, year + 1)
    } else {
        format!("{}-{}", year - 1, year)
    }
}

/// Anything able to answer "what was this team's rank just before kickoff on `date`".
pub trait RankSource {
    fn rank_before(&self, team: &str, date: NaiveDate) -> u32;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandingRow {
    pub rank: u32,
    pub team: String,
    pub points: u32,
}

/// Running points table for the current season.
///
/// Teams enter the table the first time they score a point; ties keep that
/// entry order. Teams still on zero points get the sentinel rank.
#[derive(Debug, Clone)]
pub struct SeasonStandings {
    sentinel: u32,
    season: Option<String>,
    points: Vec<(String, u32)>,
    index: HashMap<String, usize>,
}

impl SeasonStandings {
    pub fn new(sentinel: u32) -> Self {
        Self {
            sentinel,
            season: None,
            points: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn season(&self) -> Option<&str> {
        self.season.as_deref()
    }

    pub fn table(&self) -> Vec<StandingRow> {
        let mut order: Vec<usize> = (0..self.points.len()).collect();
        // stable sort keeps first-scored order among equal points
        order.sort_by(|a, b| self.points[*b].1.cmp(&self.points[*a].1));
        order
            .into_iter()
            .enumerate()
            .map(|(pos, idx)| StandingRow {
                rank: pos as u32 + 1,
                team: self.points[idx].0.clone(),
                points: self.points[idx].1,
            })
            .collect()
    }

    pub fn points(&self, team: &str) -> u32 {
        self.index.get(team).map_or(0, |&idx| self.points[idx].1)
    }

    /// Credits 3/1/0 to both sides, starting a fresh table when `date` opens a new season.
    pub fn apply_result(&mut self, home: &str, away: &str, outcome: Outcome, date: NaiveDate) {
        let key = season_key(date);
        if self.season.as_deref() != Some(key.as_str()) {
            log::debug!("new season {key}: standings reset");
            self.points.clear();
            self.index.clear();
            self.season = Some(key);
        }

        let (home_pts, away_pts) = outcome.points();
        self.credit(home, home_pts);
        self.credit(away, away_pts);
    }

    fn credit(&mut self, team: &str, pts: u32) {
        if pts == 0 {
            return;
        }
        match self.index.get(team) {
            Some(&idx) => self.points[idx].1 += pts,
            None => {
                self.index.insert(team.to_string(), self.points.len());
                self.points.push((team.to_string(), pts));
            }
        }
    }
}

impl RankSource for SeasonStandings {
    fn rank_before(&self, team: &str, date: NaiveDate) -> u32 {
        // a match opening a new season sees an empty table
        if self.season.as_deref() != Some(season_key(date).as_str()) {
            return self.sentinel;
        }
        let Some(&idx) = self.index.get(team) else {
            return self.sentinel;
        };
        let (_, pts) = self.points[idx];
        let ahead = self
            .points
            .iter()
            .enumerate()
            .filter(|(other, (_, p))| *p > pts || (*p == pts && *other < idx))
            .count();
        ahead as u32 + 1
    }
}

/// Live table for the in-progress season, falling back to another source otherwise.
pub struct LiveRankOverlay<'a> {
    season: String,
    live: &'a HashMap<String, u32>,
    fallback: &'a dyn RankSource,
    sentinel: u32,
}

impl<'a> LiveRankOverlay<'a> {
    pub fn new(
        season: String,
        live: &'a HashMap<String, u32>,
        fallback: &'a dyn RankSource,
        sentinel: u32,
    ) -> Self {
        Self {
            season,
            live,
            fallback,
            sentinel,
        }
    }
}

impl RankSource for LiveRankOverlay<'_> {
    fn rank_before(&self, team: &str, date: NaiveDate) -> u32 {
        if season_key(date) != self.season {
            return self.fallback.rank_before(team, date);
        }
        self.live.get(team).copied().unwrap_or(self.sentinel)
    }
}
