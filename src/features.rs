//! Feature assembly: one forward fold over the ordered match log.
//!
//! Every tracker is read for a match before any of them is updated with that
//! match's result. Updates are committed per calendar date, so matches sharing a
//! date all see the state as of the end of the previous date.

use std::collections::BTreeMap;

use anyhow::{Result, anyhow, bail};
use chrono::NaiveDate;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::elo::EloRatings;
use crate::form::{FormSnapshot, FormTracker};
use crate::head_to_head::{H2h, HeadToHead};
use crate::historical_dataset::{MatchEvent, OddsAverages, team_stat_names};
use crate::standings::{RankSource, SeasonStandings, season_key};

/// Numeric features keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureVector(BTreeMap<String, f64>);

impl FeatureVector {
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Values in the order of `names`; every name must be present.
    pub fn select(&self, names: &[String]) -> Result<Vec<f64>> {
        names
            .iter()
            .map(|name| {
                self.get(name)
                    .ok_or_else(|| anyhow!("feature {name:?} missing from vector"))
            })
            .collect()
    }
}

/// What a predictor gets for one match.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum MatchFeatures {
    Full(FeatureVector),
    /// No usable head-to-head history: only the two ratings are meaningful.
    StrengthOnly {
        home_strength: f64,
        away_strength: f64,
    },
}

/// Everything known about a pairing just before kickoff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreMatchContext {
    pub season: String,
    #[serde(skip)]
    pub home_form: Option<FormSnapshot>,
    #[serde(skip)]
    pub away_form: Option<FormSnapshot>,
    pub h2h: H2h,
    pub home_rank: u32,
    pub away_rank: u32,
    pub home_strength: f64,
    pub away_strength: f64,
}

impl PreMatchContext {
    pub fn match_features(&self, odds: OddsAverages) -> MatchFeatures {
        let (Some(home_form), Some(away_form), Some(_)) =
            (&self.home_form, &self.away_form, self.h2h.rates())
        else {
            return MatchFeatures::StrengthOnly {
                home_strength: self.home_strength,
                away_strength: self.away_strength,
            };
        };
        MatchFeatures::Full(build_feature_vector(
            home_form,
            away_form,
            &self.h2h,
            (self.home_rank, self.away_rank),
            (self.home_strength, self.away_strength),
            odds,
        ))
    }
}

/// Read-side result for one match, before the form filter.
#[derive(Debug, Clone, PartialEq)]
pub struct PreMatchSnapshot {
    pub event: MatchEvent,
    pub context: PreMatchContext,
    pub odds: OddsAverages,
}

impl PreMatchSnapshot {
    /// `None` when either side lacks rolling-form history.
    pub fn into_row(self) -> Option<EnrichedFeatureRow> {
        let home_form = self.context.home_form?;
        let away_form = self.context.away_form?;
        Some(EnrichedFeatureRow {
            event: self.event,
            season: self.context.season,
            home_form,
            away_form,
            h2h: self.context.h2h,
            home_rank: self.context.home_rank,
            away_rank: self.context.away_rank,
            home_strength: self.context.home_strength,
            away_strength: self.context.away_strength,
            odds: self.odds,
        })
    }
}

/// One output row: the match plus every feature observed before it.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedFeatureRow {
    pub event: MatchEvent,
    pub season: String,
    pub home_form: FormSnapshot,
    pub away_form: FormSnapshot,
    pub h2h: H2h,
    pub home_rank: u32,
    pub away_rank: u32,
    pub home_strength: f64,
    pub away_strength: f64,
    pub odds: OddsAverages,
}

impl EnrichedFeatureRow {
    pub fn feature_vector(&self) -> FeatureVector {
        build_feature_vector(
            &self.home_form,
            &self.away_form,
            &self.h2h,
            (self.home_rank, self.away_rank),
            (self.home_strength, self.away_strength),
            self.odds,
        )
    }

    pub fn match_features(&self) -> MatchFeatures {
        match self.h2h {
            H2h::Rates(_) => MatchFeatures::Full(self.feature_vector()),
            H2h::NoHistory => MatchFeatures::StrengthOnly {
                home_strength: self.home_strength,
                away_strength: self.away_strength,
            },
        }
    }
}

fn build_feature_vector(
    home_form: &FormSnapshot,
    away_form: &FormSnapshot,
    h2h: &H2h,
    ranks: (u32, u32),
    strengths: (f64, f64),
    odds: OddsAverages,
) -> FeatureVector {
    let mut fv = FeatureVector::default();
    for (idx, stat) in team_stat_names().iter().enumerate() {
        let home = home_form.means[idx];
        let away = away_form.means[idx];
        fv.insert(format!("home_form_{stat}"), home);
        fv.insert(format!("away_form_{stat}"), away);
        fv.insert(format!("form_diff_{stat}"), home - away);
    }
    if let Some(r) = h2h.rates() {
        fv.insert("a_h2h_rate", r.a_win_rate);
        fv.insert("b_h2h_rate", r.b_win_rate);
        fv.insert("h2h_draw_rate", r.draw_rate);
        fv.insert("h2h_meetings", r.meetings as f64);
    }
    fv.insert("home_rank", ranks.0 as f64);
    fv.insert("away_rank", ranks.1 as f64);
    fv.insert("home_strength", strengths.0);
    fv.insert("away_strength", strengths.1);
    for (name, value) in [
        ("avg_odds_h", odds.home),
        ("avg_odds_d", odds.draw),
        ("avg_odds_a", odds.away),
    ] {
        if let Some(v) = value {
            fv.insert(name, v);
        }
    }
    fv
}

/// Per-team and per-pair state after some prefix of the match log.
#[derive(Debug, Clone)]
pub struct LeagueState {
    form: FormTracker,
    h2h: HeadToHead,
    standings: SeasonStandings,
    elo: EloRatings,
    last_applied: Option<NaiveDate>,
}

impl LeagueState {
    pub fn new(cfg: PipelineConfig) -> Self {
        Self {
            form: FormTracker::new(cfg.form_window),
            h2h: HeadToHead::new(),
            standings: SeasonStandings::new(cfg.rank_sentinel),
            elo: EloRatings::new(cfg.elo),
            last_applied: None,
        }
    }

    /// Date of the latest match whose result is folded in.
    pub fn last_applied(&self) -> Option<NaiveDate> {
        self.last_applied
    }

    pub fn form(&self) -> &FormTracker {
        &self.form
    }

    pub fn head_to_head(&self) -> &HeadToHead {
        &self.h2h
    }

    pub fn standings(&self) -> &SeasonStandings {
        &self.standings
    }

    pub fn elo(&self) -> &EloRatings {
        &self.elo
    }

    /// Reads every tracker for `home` vs `away` kicking off on `date`. Never mutates.
    pub fn context(
        &self,
        home: &str,
        away: &str,
        date: NaiveDate,
        ranks: &dyn RankSource,
    ) -> PreMatchContext {
        PreMatchContext {
            season: season_key(date),
            home_form: self.form.observe(home),
            away_form: self.form.observe(away),
            h2h: self.h2h.h2h(home, away),
            home_rank: ranks.rank_before(home, date),
            away_rank: ranks.rank_before(away, date),
            home_strength: self.elo.rating(home),
            away_strength: self.elo.rating(away),
        }
    }

    /// Features for an upcoming fixture; `ranks` overrides the historical standings.
    ///
    /// Errors when the folded history reaches `date` or the two sides are the same team.
    pub fn fixture_features(
        &self,
        home: &str,
        away: &str,
        date: NaiveDate,
        odds: OddsAverages,
        ranks: Option<&dyn RankSource>,
    ) -> Result<(PreMatchContext, MatchFeatures)> {
        if home == away {
            bail!("fixture lists {home} on both sides");
        }
        if let Some(last) = self.last_applied
            && last >= date
        {
            bail!("history includes results from {last}, not before the fixture date {date}");
        }
        let ranks: &dyn RankSource = match ranks {
            Some(live) => live,
            None => &self.standings,
        };
        let ctx = self.context(home, away, date, ranks);
        if ctx.home_form.is_none() || ctx.away_form.is_none() {
            log::info!("{home} vs {away}: no rolling form for one side, strength-only features");
        }
        let features = ctx.match_features(odds);
        Ok((ctx, features))
    }

    /// Post-match updates, in the fixed order form, head-to-head, standings, rating.
    fn apply(&mut self, event: &MatchEvent) {
        self.form.record(&event.home_team, event.home_line());
        self.form.record(&event.away_team, event.away_line());
        self.h2h
            .record(&event.home_team, &event.away_team, event.outcome);
        self.standings.apply_result(
            &event.home_team,
            &event.away_team,
            event.outcome,
            event.date,
        );
        self.elo
            .update(&event.home_team, &event.away_team, event.outcome);
        self.last_applied = Some(event.date);
    }
}

/// Single-writer fold driver; accepts events one at a time in date order.
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    state: LeagueState,
    pending: Vec<MatchEvent>,
    last_date: Option<NaiveDate>,
    carried_odds: OddsAverages,
}

impl FeaturePipeline {
    pub fn new(cfg: PipelineConfig) -> Self {
        Self {
            state: LeagueState::new(cfg),
            pending: Vec::new(),
            last_date: None,
            carried_odds: OddsAverages::default(),
        }
    }

    /// Reads features for `event`, then queues its result for commit.
    ///
    /// Errors when `event` is dated before an event already pushed, or pits a
    /// team against itself.
    pub fn push(&mut self, event: MatchEvent) -> Result<PreMatchSnapshot> {
        if event.home_team == event.away_team {
            bail!(
                "match on {} lists {} on both sides",
                event.date,
                event.home_team
            );
        }
        if let Some(last) = self.last_date {
            if event.date < last {
                bail!(
                    "match {} vs {} on {} arrived after {}",
                    event.home_team,
                    event.away_team,
                    event.date,
                    last
                );
            }
            if event.date > last {
                self.commit_pending();
            }
        }
        self.last_date = Some(event.date);

        let context = self.state.context(
            &event.home_team,
            &event.away_team,
            event.date,
            &self.state.standings,
        );
        let odds = event.odds.or_carry(self.carried_odds);
        self.carried_odds = odds;

        self.pending.push(event.clone());
        Ok(PreMatchSnapshot {
            event,
            context,
            odds,
        })
    }

    /// Committed state only; results from the latest pushed date stay queued
    /// until a later date arrives or the pipeline is consumed.
    pub fn state(&self) -> &LeagueState {
        &self.state
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn into_state(mut self) -> LeagueState {
        self.commit_pending();
        self.state
    }

    fn commit_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for event in &pending {
            self.state.apply(event);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FoldSummary {
    pub processed: usize,
    pub emitted: usize,
    pub insufficient_form: usize,
    /// Emitted rows whose pairing had never met before.
    pub no_h2h_history: usize,
}

pub struct FeatureBuild {
    pub rows: Vec<EnrichedFeatureRow>,
    pub summary: FoldSummary,
    pub state: LeagueState,
}

/// Folds the whole ordered log, keeping rows with rolling form for both sides.
pub fn build_feature_rows(events: &[MatchEvent], cfg: PipelineConfig) -> Result<FeatureBuild> {
    let mut pipeline = FeaturePipeline::new(cfg);
    let mut summary = FoldSummary::default();
    let mut rows = Vec::new();

    for event in events {
        let snapshot = pipeline.push(event.clone())?;
        summary.processed += 1;
        match snapshot.into_row() {
            Some(row) => {
                if row.h2h == H2h::NoHistory {
                    summary.no_h2h_history += 1;
                }
                rows.push(row);
            }
            None => summary.insufficient_form += 1,
        }
    }
    summary.emitted = rows.len();

    log::info!(
        "feature fold: {} matches, {} rows emitted, {} without form history, {} without h2h",
        summary.processed,
        summary.emitted,
        summary.insufficient_form,
        summary.no_h2h_history
    );

    Ok(FeatureBuild {
        rows,
        summary,
        state: pipeline.into_state(),
    })
}

/// League state as of kickoff on `date`, plus the latest odds seen before it.
pub struct FixtureHistory {
    pub state: LeagueState,
    pub last_odds: OddsAverages,
}

/// Folds only the matches of the date-ordered log that fall strictly before `date`.
pub fn state_before(
    events: &[MatchEvent],
    date: NaiveDate,
    cfg: PipelineConfig,
) -> Result<FixtureHistory> {
    let cut = events.partition_point(|e| e.date < date);
    if cut < events.len() {
        log::warn!(
            "ignoring {} matches dated on or after {date}",
            events.len() - cut
        );
    }
    let mut pipeline = FeaturePipeline::new(cfg);
    for event in &events[..cut] {
        pipeline.push(event.clone())?;
    }
    Ok(FixtureHistory {
        last_odds: pipeline.carried_odds,
        state: pipeline.into_state(),
    })
}
