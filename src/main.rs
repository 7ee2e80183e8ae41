use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;

use league_features::calibration::Prob3;
use league_features::config::PipelineConfig;
use league_features::feature_export;
use league_features::features::{self, MatchFeatures, PreMatchContext};
use league_features::historical_dataset::{self, OddsAverages};
use league_features::predictor::StrengthFallback;
use league_features::standings::{LiveRankOverlay, RankSource, season_key};

#[derive(Parser)]
#[command(name = "league_features")]
#[command(about = "Leakage-free pre-match features from a league results log", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fold the full history and write one enriched row per retained match
    Build {
        /// Historical results CSV
        #[arg(short, long)]
        input: PathBuf,
        /// Enriched CSV to write
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Feature set for an upcoming fixture after folding the full history
    Fixture {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        home: String,
        #[arg(long)]
        away: String,
        /// Kickoff date (dd/mm/yyyy or yyyy-mm-dd)
        #[arg(long)]
        date: String,
        /// JSON object of team -> current league position for the season in progress
        #[arg(long)]
        live_ranks: Option<PathBuf>,
        /// Average home-win price; falls back to the last price in the history
        #[arg(long)]
        odds_h: Option<f64>,
        #[arg(long)]
        odds_d: Option<f64>,
        #[arg(long)]
        odds_a: Option<f64>,
    },
}

#[derive(Serialize)]
struct FixtureReport<'a> {
    home: &'a str,
    away: &'a str,
    date: String,
    context: PreMatchContext,
    features: MatchFeatures,
    #[serde(skip_serializing_if = "Option::is_none")]
    strength_only_probs: Option<Prob3>,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let cfg = PipelineConfig::from_env();
    log::debug!("config: {cfg:?}");

    match cli.command {
        Commands::Build { input, output } => run_build(&input, &output, cfg),
        Commands::Fixture {
            input,
            home,
            away,
            date,
            live_ranks,
            odds_h,
            odds_d,
            odds_a,
        } => {
            let odds = OddsAverages {
                home: odds_h,
                draw: odds_d,
                away: odds_a,
            };
            run_fixture(&input, &home, &away, &date, live_ranks, odds, cfg)
        }
    }
}

fn run_build(input: &Path, output: &Path, cfg: PipelineConfig) -> Result<()> {
    let (events, load) = historical_dataset::load_matches_csv(input)?;
    let build = features::build_feature_rows(&events, cfg)?;
    feature_export::save_feature_rows(output, &build.rows)?;

    println!("Feature build complete");
    println!("Input: {}", input.display());
    println!(
        "Rows: {} read, {} usable, {} dropped",
        load.rows_read,
        load.kept,
        load.dropped()
    );
    println!(
        "Matches folded: {} (emitted {}, no form history {})",
        build.summary.processed, build.summary.emitted, build.summary.insufficient_form
    );
    println!(
        "Rows on strength-only path (no h2h): {}",
        build.summary.no_h2h_history
    );
    if let (Some(first), Some(last)) = (build.rows.first(), build.rows.last()) {
        println!("Range: {} -> {}", first.event.date, last.event.date);
    }
    println!("Output: {}", output.display());
    Ok(())
}

fn run_fixture(
    input: &Path,
    home: &str,
    away: &str,
    raw_date: &str,
    live_ranks: Option<PathBuf>,
    odds: OddsAverages,
    cfg: PipelineConfig,
) -> Result<()> {
    if home == away {
        return Err(anyhow!("fixture lists {home} on both sides"));
    }
    let date = historical_dataset::parse_match_date(raw_date)
        .ok_or_else(|| anyhow!("unparseable fixture date {raw_date:?}"))?;
    let (events, _) = historical_dataset::load_matches_csv(input)?;
    let history = features::state_before(&events, date, cfg)?;
    let odds = odds.or_carry(history.last_odds);
    let state = history.state;

    let live = match live_ranks {
        Some(path) => {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("read live ranks {}", path.display()))?;
            Some(
                serde_json::from_str::<HashMap<String, u32>>(&raw)
                    .with_context(|| format!("parse live ranks {}", path.display()))?,
            )
        }
        None => None,
    };
    let overlay = live.as_ref().map(|table| {
        LiveRankOverlay::new(season_key(date), table, state.standings(), cfg.rank_sentinel)
    });
    let ranks = overlay.as_ref().map(|o| o as &dyn RankSource);

    let (context, features) = state.fixture_features(home, away, date, odds, ranks)?;
    let strength_only_probs = match &features {
        MatchFeatures::StrengthOnly {
            home_strength,
            away_strength,
        } => Some(StrengthFallback::new(cfg.fallback_draw_rate).probs(*home_strength, *away_strength)),
        MatchFeatures::Full(_) => None,
    };

    let report = FixtureReport {
        home,
        away,
        date: date.format("%Y-%m-%d").to_string(),
        context,
        features,
        strength_only_probs,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serialize fixture report")?
    );
    Ok(())
}
