use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calibration::Outcome;

/// Per-side match statistics tracked for rolling form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Goals,
    HalfTimeGoals,
    Shots,
    ShotsOnTarget,
    Fouls,
    Corners,
    YellowCards,
    RedCards,
}

pub const STAT_KINDS: usize = 8;

/// Width of a team-perspective stat line: every kind as `for` and `against`.
pub const TEAM_STAT_WIDTH: usize = STAT_KINDS * 2;

impl StatKind {
    pub const ALL: [StatKind; STAT_KINDS] = [
        StatKind::Goals,
        StatKind::HalfTimeGoals,
        StatKind::Shots,
        StatKind::ShotsOnTarget,
        StatKind::Fouls,
        StatKind::Corners,
        StatKind::YellowCards,
        StatKind::RedCards,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StatKind::Goals => "goals",
            StatKind::HalfTimeGoals => "ht_goals",
            StatKind::Shots => "shots",
            StatKind::ShotsOnTarget => "shots_on_target",
            StatKind::Fouls => "fouls",
            StatKind::Corners => "corners",
            StatKind::YellowCards => "yellows",
            StatKind::RedCards => "reds",
        }
    }
}

pub type SideStats = [Option<f64>; STAT_KINDS];

/// Names of the team-perspective values, in stat-line order.
pub fn team_stat_names() -> Vec<String> {
    StatKind::ALL
        .iter()
        .flat_map(|k| [format!("{}_for", k.name()), format!("{}_against", k.name())])
        .collect()
}

/// One team's own statistics from a single match, regardless of venue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamStatLine(pub [Option<f64>; TEAM_STAT_WIDTH]);

impl TeamStatLine {
    pub fn from_sides(own: &SideStats, opponent: &SideStats) -> Self {
        let mut values = [None; TEAM_STAT_WIDTH];
        for k in 0..STAT_KINDS {
            values[2 * k] = own[k];
            values[2 * k + 1] = opponent[k];
        }
        Self(values)
    }
}

/// Mean bookmaker prices per outcome; a side is `None` when no bookmaker priced it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OddsAverages {
    pub home: Option<f64>,
    pub draw: Option<f64>,
    pub away: Option<f64>,
}

impl OddsAverages {
    pub fn is_empty(&self) -> bool {
        self.home.is_none() && self.draw.is_none() && self.away.is_none()
    }

    /// Fills the gaps of `self` from `earlier`.
    pub fn or_carry(self, earlier: OddsAverages) -> Self {
        Self {
            home: self.home.or(earlier.home),
            draw: self.draw.or(earlier.draw),
            away: self.away.or(earlier.away),
        }
    }
}

/// A finished match, immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchEvent {
    /// Position in the source; breaks date ties.
    pub seq: usize,
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub outcome: Outcome,
    pub home_stats: SideStats,
    pub away_stats: SideStats,
    pub odds: OddsAverages,
}

impl MatchEvent {
    pub fn home_line(&self) -> TeamStatLine {
        TeamStatLine::from_sides(&self.home_stats, &self.away_stats)
    }

    pub fn away_line(&self) -> TeamStatLine {
        TeamStatLine::from_sides(&self.away_stats, &self.home_stats)
    }

    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }
}

/// One CSV row as found in the source, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMatchRow {
    #[serde(rename = "Date", alias = "MatchDate")]
    pub date: Option<String>,
    #[serde(rename = "HomeTeam")]
    pub home_team: Option<String>,
    #[serde(rename = "AwayTeam")]
    pub away_team: Option<String>,
    #[serde(rename = "FTR", alias = "FullTimeResult")]
    pub result: Option<String>,

    #[serde(rename = "FTHG", alias = "FullTimeHomeGoals", deserialize_with = "csv::invalid_option")]
    pub home_goals: Option<f64>,
    #[serde(rename = "FTAG", alias = "FullTimeAwayGoals", deserialize_with = "csv::invalid_option")]
    pub away_goals: Option<f64>,
    #[serde(rename = "HTHG", alias = "HalfTimeHomeGoals", deserialize_with = "csv::invalid_option")]
    pub home_ht_goals: Option<f64>,
    #[serde(rename = "HTAG", alias = "HalfTimeAwayGoals", deserialize_with = "csv::invalid_option")]
    pub away_ht_goals: Option<f64>,
    #[serde(rename = "HS", alias = "HomeShots", deserialize_with = "csv::invalid_option")]
    pub home_shots: Option<f64>,
    #[serde(rename = "AS", alias = "AwayShots", deserialize_with = "csv::invalid_option")]
    pub away_shots: Option<f64>,
    #[serde(rename = "HST", alias = "HomeShotsOnTarget", deserialize_with = "csv::invalid_option")]
    pub home_shots_on_target: Option<f64>,
    #[serde(rename = "AST", alias = "AwayShotsOnTarget", deserialize_with = "csv::invalid_option")]
    pub away_shots_on_target: Option<f64>,
    #[serde(rename = "HF", alias = "HomeFouls", deserialize_with = "csv::invalid_option")]
    pub home_fouls: Option<f64>,
    #[serde(rename = "AF", alias = "AwayFouls", deserialize_with = "csv::invalid_option")]
    pub away_fouls: Option<f64>,
    #[serde(rename = "HC", alias = "HomeCorners", deserialize_with = "csv::invalid_option")]
    pub home_corners: Option<f64>,
    #[serde(rename = "AC", alias = "AwayCorners", deserialize_with = "csv::invalid_option")]
    pub away_corners: Option<f64>,
    #[serde(rename = "HY", alias = "HomeYellowCards", deserialize_with = "csv::invalid_option")]
    pub home_yellows: Option<f64>,
    #[serde(rename = "AY", alias = "AwayYellowCards", deserialize_with = "csv::invalid_option")]
    pub away_yellows: Option<f64>,
    #[serde(rename = "HR", alias = "HomeRedCards", deserialize_with = "csv::invalid_option")]
    pub home_reds: Option<f64>,
    #[serde(rename = "AR", alias = "AwayRedCards", deserialize_with = "csv::invalid_option")]
    pub away_reds: Option<f64>,

    #[serde(rename = "B365H", deserialize_with = "csv::invalid_option")]
    pub b365_home: Option<f64>,
    #[serde(rename = "B365D", deserialize_with = "csv::invalid_option")]
    pub b365_draw: Option<f64>,
    #[serde(rename = "B365A", deserialize_with = "csv::invalid_option")]
    pub b365_away: Option<f64>,
    #[serde(rename = "WHH", deserialize_with = "csv::invalid_option")]
    pub wh_home: Option<f64>,
    #[serde(rename = "WHD", deserialize_with = "csv::invalid_option")]
    pub wh_draw: Option<f64>,
    #[serde(rename = "WHA", deserialize_with = "csv::invalid_option")]
    pub wh_away: Option<f64>,
    #[serde(rename = "LBH", deserialize_with = "csv::invalid_option")]
    pub lb_home: Option<f64>,
    #[serde(rename = "LBD", deserialize_with = "csv::invalid_option")]
    pub lb_draw: Option<f64>,
    #[serde(rename = "LBA", deserialize_with = "csv::invalid_option")]
    pub lb_away: Option<f64>,
}

impl RawMatchRow {
    fn home_stats(&self) -> SideStats {
        [
            self.home_goals,
            self.home_ht_goals,
            self.home_shots,
            self.home_shots_on_target,
            self.home_fouls,
            self.home_corners,
            self.home_yellows,
            self.home_reds,
        ]
    }

    fn away_stats(&self) -> SideStats {
        [
            self.away_goals,
            self.away_ht_goals,
            self.away_shots,
            self.away_shots_on_target,
            self.away_fouls,
            self.away_corners,
            self.away_yellows,
            self.away_reds,
        ]
    }

    fn odds(&self) -> OddsAverages {
        OddsAverages {
            home: mean_present(&[self.b365_home, self.wh_home, self.lb_home]),
            draw: mean_present(&[self.b365_draw, self.wh_draw, self.lb_draw]),
            away: mean_present(&[self.b365_away, self.wh_away, self.lb_away]),
        }
    }
}

/// Counts of what the loader kept and why rows were dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub rows_read: usize,
    pub kept: usize,
    pub dropped_missing_date: usize,
    pub dropped_bad_date: usize,
    pub dropped_missing_team: usize,
    pub dropped_same_team: usize,
    pub dropped_bad_result: usize,
}

impl LoadSummary {
    pub fn dropped(&self) -> usize {
        self.dropped_missing_date
            + self.dropped_bad_date
            + self.dropped_missing_team
            + self.dropped_same_team
            + self.dropped_bad_result
    }
}

const REQUIRED_COLUMNS: [(&str, &[&str]); 4] = [
    ("date", &["Date", "MatchDate"]),
    ("home team", &["HomeTeam"]),
    ("away team", &["AwayTeam"]),
    ("result", &["FTR", "FullTimeResult"]),
];

/// Loads a match CSV from disk, falling back to Latin-1 when the file is not UTF-8.
pub fn load_matches_csv(path: &Path) -> Result<(Vec<MatchEvent>, LoadSummary)> {
    let bytes = fs::read(path).with_context(|| format!("read match csv {}", path.display()))?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            log::debug!("{} is not utf-8, decoding as latin-1", path.display());
            err.into_bytes().iter().map(|&b| b as char).collect()
        }
    };
    read_matches_csv(text.trim_start_matches('\u{feff}').as_bytes())
        .with_context(|| format!("parse match csv {}", path.display()))
}

pub fn read_matches_csv<R: Read>(reader: R) -> Result<(Vec<MatchEvent>, LoadSummary)> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("read csv header")?.clone();
    for (label, names) in REQUIRED_COLUMNS {
        if !names.iter().any(|name| headers.iter().any(|h| h == *name)) {
            bail!("missing required {label} column (expected one of {names:?})");
        }
    }

    let mut rows = Vec::new();
    for (idx, row) in rdr.deserialize::<RawMatchRow>().enumerate() {
        // +2: one for the header, one for 1-based line numbers
        rows.push(row.with_context(|| format!("decode csv line {}", idx + 2))?);
    }
    Ok(events_from_rows(rows))
}

/// Validates raw rows, drops unusable ones and stable-sorts the rest by date.
pub fn events_from_rows(rows: Vec<RawMatchRow>) -> (Vec<MatchEvent>, LoadSummary) {
    let mut summary = LoadSummary {
        rows_read: rows.len(),
        ..LoadSummary::default()
    };

    let mut events = Vec::with_capacity(rows.len());
    for (seq, row) in rows.into_iter().enumerate() {
        let Some(raw_date) = non_empty(row.date.as_deref()) else {
            log::debug!("row {seq}: missing date");
            summary.dropped_missing_date += 1;
            continue;
        };
        let Some(date) = parse_match_date(raw_date) else {
            log::debug!("row {seq}: unparseable date {raw_date:?}");
            summary.dropped_bad_date += 1;
            continue;
        };
        let (Some(home_team), Some(away_team)) = (
            non_empty(row.home_team.as_deref()),
            non_empty(row.away_team.as_deref()),
        ) else {
            log::debug!("row {seq}: missing team");
            summary.dropped_missing_team += 1;
            continue;
        };
        if home_team == away_team {
            log::debug!("row {seq}: {home_team} listed on both sides");
            summary.dropped_same_team += 1;
            continue;
        }
        let Some(outcome) = row.result.as_deref().and_then(Outcome::from_code) else {
            log::debug!("row {seq}: unusable result {:?}", row.result);
            summary.dropped_bad_result += 1;
            continue;
        };

        events.push(MatchEvent {
            seq,
            date,
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            outcome,
            home_stats: row.home_stats(),
            away_stats: row.away_stats(),
            odds: row.odds(),
        });
    }

    // stable: equal dates keep source order
    events.sort_by_key(|e| e.date);
    summary.kept = events.len();

    if summary.dropped() > 0 {
        log::warn!(
            "dropped {} of {} rows (missing date {}, bad date {}, missing team {}, same team {}, bad result {})",
            summary.dropped(),
            summary.rows_read,
            summary.dropped_missing_date,
            summary.dropped_bad_date,
            summary.dropped_missing_team,
            summary.dropped_same_team,
            summary.dropped_bad_result
        );
    }
    log::info!("loaded {} matches", summary.kept);
    (events, summary)
}

/// Parses a day-first date (`dd/mm/yyyy`, `dd/mm/yy`, `-` or `.` separated) or ISO `yyyy-mm-dd`.
pub fn parse_match_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    // drop a trailing time component if present
    let raw = raw.split_whitespace().next()?;

    let parts: Vec<&str> = raw.split(['/', '-', '.']).collect();
    let [a, b, c] = parts.as_slice() else {
        return None;
    };
    if a.len() == 4 {
        let year = a.parse::<i32>().ok()?;
        let month = b.parse::<u32>().ok()?;
        let day = c.parse::<u32>().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let day = a.parse::<u32>().ok()?;
    let month = b.parse::<u32>().ok()?;
    let year = match c.len() {
        2 => {
            let yy = c.parse::<i32>().ok()?;
            if yy <= 68 { 2000 + yy } else { 1900 + yy }
        }
        4 => c.parse::<i32>().ok()?,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn mean_present(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().sum::<f64>() / present.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_match_date_is_day_first() {
        assert_eq!(parse_match_date("01/08/2023"), Some(ymd(2023, 8, 1)));
        assert_eq!(parse_match_date("13/05/19"), Some(ymd(2019, 5, 13)));
        assert_eq!(parse_match_date("19/08/95"), Some(ymd(1995, 8, 19)));
        assert_eq!(parse_match_date("2021-02-03"), Some(ymd(2021, 2, 3)));
        assert_eq!(parse_match_date("03.02.2021"), Some(ymd(2021, 2, 3)));
        assert_eq!(parse_match_date("31/02/2021"), None);
        assert_eq!(parse_match_date("yesterday"), None);
        assert_eq!(parse_match_date(""), None);
    }

    #[test]
    fn rows_are_dropped_and_counted() {
        let good = RawMatchRow {
            date: Some("02/01/2020".to_string()),
            home_team: Some("A".to_string()),
            away_team: Some("B".to_string()),
            result: Some("H".to_string()),
            ..RawMatchRow::default()
        };
        let earlier = RawMatchRow {
            date: Some("01/01/2020".to_string()),
            ..good.clone()
        };
        let no_date = RawMatchRow {
            date: None,
            ..good.clone()
        };
        let bad_date = RawMatchRow {
            date: Some("soon".to_string()),
            ..good.clone()
        };
        let no_team = RawMatchRow {
            away_team: Some("  ".to_string()),
            ..good.clone()
        };
        let bad_result = RawMatchRow {
            result: Some("P".to_string()),
            ..good.clone()
        };
        let same_team = RawMatchRow {
            away_team: Some(" A ".to_string()),
            ..good.clone()
        };

        let (events, summary) = events_from_rows(vec![
            good, no_date, bad_date, no_team, bad_result, same_team, earlier,
        ]);
        assert_eq!(summary.rows_read, 7);
        assert_eq!(summary.kept, 2);
        assert_eq!(summary.dropped(), 5);
        assert_eq!(summary.dropped_bad_date, 1);
        assert_eq!(summary.dropped_same_team, 1);
        assert_eq!(events[0].date, ymd(2020, 1, 1));
        assert_eq!(events[0].seq, 6);
        assert_eq!(events[1].seq, 0);
    }

    #[test]
    fn team_line_projects_own_perspective() {
        let mut home: SideStats = [None; STAT_KINDS];
        let mut away: SideStats = [None; STAT_KINDS];
        home[0] = Some(2.0);
        away[0] = Some(1.0);
        let line = TeamStatLine::from_sides(&away, &home);
        assert_eq!(line.0[0], Some(1.0));
        assert_eq!(line.0[1], Some(2.0));
        assert_eq!(team_stat_names()[1], "goals_against");
    }

    #[test]
    fn odds_average_ignores_missing_bookmakers() {
        let row = RawMatchRow {
            b365_home: Some(2.0),
            wh_home: Some(2.2),
            lb_draw: Some(3.4),
            ..RawMatchRow::default()
        };
        let odds = row.odds();
        assert!((odds.home.unwrap() - 2.1).abs() < 1e-12);
        assert_eq!(odds.draw, Some(3.4));
        assert_eq!(odds.away, None);
    }
}
