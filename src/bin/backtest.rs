use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;

use league_features::calibration::{self, Outcome, Prob3};
use league_features::config::PipelineConfig;
use league_features::features::{self, EnrichedFeatureRow};
use league_features::head_to_head::H2h;
use league_features::historical_dataset;
use league_features::predictor::StrengthFallback;

/// Walk-forward check of the strength-only fallback over the enriched rows.
#[derive(Parser)]
#[command(name = "backtest")]
struct Args {
    /// Historical results CSV
    input: PathBuf,
    /// Draw mass at rating parity (defaults to FALLBACK_DRAW_RATE)
    #[arg(long)]
    draw_rate: Option<f64>,
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = Args::parse();
    let log_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let cfg = PipelineConfig::from_env();
    let draw_rate = args
        .draw_rate
        .unwrap_or(cfg.fallback_draw_rate)
        .clamp(0.0, 0.6);
    let fallback = StrengthFallback::new(draw_rate);

    let (events, _) = historical_dataset::load_matches_csv(&args.input)?;
    let build = features::build_feature_rows(&events, cfg)?;
    let rows = build.rows;
    if rows.is_empty() {
        return Err(anyhow!(
            "no enriched rows produced from {}",
            args.input.display()
        ));
    }

    let outcomes: Vec<Outcome> = rows.iter().map(|r| r.event.outcome).collect();
    let strength: Vec<Prob3> = rows.iter().map(|r| strength_probs(r, fallback)).collect();
    let walk_empirical = walk_forward_empirical(&outcomes);
    let uniform = vec![Prob3::uniform(); outcomes.len()];

    println!("Strength-only fallback backtest");
    println!("Input: {}", args.input.display());
    println!("Samples: {}", outcomes.len());
    if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
        println!("Range: {} -> {}", first.event.date, last.event.date);
    }
    println!("Draw rate at parity: {draw_rate:.3}");
    println!();

    print_metrics(
        "Strength-only (all rows)",
        calibration::evaluate_probs(&strength, &outcomes),
    );
    print_metrics(
        "Walk-forward empirical baseline",
        calibration::evaluate_probs(&walk_empirical, &outcomes),
    );
    print_metrics(
        "Uniform baseline",
        calibration::evaluate_probs(&uniform, &outcomes),
    );

    let (mut no_h2h_preds, mut no_h2h_outcomes) = (Vec::new(), Vec::new());
    for ((row, p), o) in rows.iter().zip(&strength).zip(&outcomes) {
        if row.h2h == H2h::NoHistory {
            no_h2h_preds.push(*p);
            no_h2h_outcomes.push(*o);
        }
    }
    print_metrics(
        "Strength-only (rows with no h2h history)",
        calibration::evaluate_probs(&no_h2h_preds, &no_h2h_outcomes),
    );

    let empirical = calibration::empirical_outcome_probs(&outcomes);
    println!();
    println!(
        "Empirical outcome probs: H={:.3} D={:.3} A={:.3}",
        empirical.home, empirical.draw, empirical.away
    );

    println!();
    println!("Home-win calibration bins:");
    for bin in calibration::calibration_bins(&strength, &outcomes, Outcome::Home, 10) {
        if bin.count == 0 {
            continue;
        }
        println!(
            "  [{:.1},{:.1}) n={:<4} pred={:.3} actual={:.3}",
            bin.bucket_start, bin.bucket_end, bin.count, bin.avg_pred, bin.actual_rate
        );
    }

    Ok(())
}

fn strength_probs(row: &EnrichedFeatureRow, fallback: StrengthFallback) -> Prob3 {
    fallback.probs(row.home_strength, row.away_strength)
}

/// Outcome frequencies of the rows before each row; uniform for the first.
fn walk_forward_empirical(outcomes: &[Outcome]) -> Vec<Prob3> {
    let mut out = Vec::with_capacity(outcomes.len());
    let (mut home, mut draw, mut away) = (0usize, 0usize, 0usize);
    for (idx, outcome) in outcomes.iter().enumerate() {
        if idx == 0 {
            out.push(Prob3::uniform());
        } else {
            let n = idx as f64;
            out.push(Prob3 {
                home: home as f64 / n,
                draw: draw as f64 / n,
                away: away as f64 / n,
            });
        }
        match outcome {
            Outcome::Home => home += 1,
            Outcome::Draw => draw += 1,
            Outcome::Away => away += 1,
        }
    }
    out
}

fn print_metrics(label: &str, metrics: calibration::Metrics) {
    println!("{label}:");
    println!(
        "  samples={} brier={:.4} log_loss={:.4} accuracy={:.3}",
        metrics.samples, metrics.brier, metrics.log_loss, metrics.accuracy
    );
}
