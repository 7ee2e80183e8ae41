use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::features::EnrichedFeatureRow;
use crate::head_to_head::H2h;
use crate::historical_dataset::{SideStats, StatKind, team_stat_names};

/// Header of the enriched table, in write order.
pub fn column_names() -> Vec<String> {
    let mut cols: Vec<String> = ["date", "home_team", "away_team", "result", "season"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for side in ["home", "away"] {
        for kind in StatKind::ALL {
            cols.push(format!("{side}_{}", kind.name()));
        }
    }
    let stats = team_stat_names();
    for prefix in ["home_form", "away_form", "form_diff"] {
        for stat in &stats {
            cols.push(format!("{prefix}_{stat}"));
        }
    }
    for name in [
        "a_h2h_rate",
        "b_h2h_rate",
        "h2h_draw_rate",
        "h2h_meetings",
        "home_rank",
        "away_rank",
        "home_strength",
        "away_strength",
        "avg_odds_h",
        "avg_odds_d",
        "avg_odds_a",
    ] {
        cols.push(name.to_string());
    }
    cols
}

/// Cells for one row; absent values (no h2h history, missing stats or odds) are empty.
pub fn row_record(row: &EnrichedFeatureRow) -> Vec<String> {
    let e = &row.event;
    let mut out = vec![
        e.date.format("%Y-%m-%d").to_string(),
        e.home_team.clone(),
        e.away_team.clone(),
        e.outcome.code().to_string(),
        row.season.clone(),
    ];
    push_side(&mut out, &e.home_stats);
    push_side(&mut out, &e.away_stats);

    out.extend(row.home_form.means.iter().map(|v| fmt_f64(*v)));
    out.extend(row.away_form.means.iter().map(|v| fmt_f64(*v)));
    out.extend(
        row.home_form
            .means
            .iter()
            .zip(row.away_form.means.iter())
            .map(|(h, a)| fmt_f64(h - a)),
    );

    match &row.h2h {
        H2h::Rates(r) => {
            out.push(fmt_f64(r.a_win_rate));
            out.push(fmt_f64(r.b_win_rate));
            out.push(fmt_f64(r.draw_rate));
            out.push(r.meetings.to_string());
        }
        H2h::NoHistory => {
            out.extend([String::new(), String::new(), String::new()]);
            out.push("0".to_string());
        }
    }

    out.push(row.home_rank.to_string());
    out.push(row.away_rank.to_string());
    out.push(fmt_f64(row.home_strength));
    out.push(fmt_f64(row.away_strength));
    for v in [row.odds.home, row.odds.draw, row.odds.away] {
        out.push(v.map(fmt_f64).unwrap_or_default());
    }
    out
}

pub fn write_feature_rows<W: Write>(writer: W, rows: &[EnrichedFeatureRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(column_names())
        .context("write feature header")?;
    for row in rows {
        wtr.write_record(row_record(row))
            .with_context(|| format!("write feature row for match #{}", row.event.seq))?;
    }
    wtr.flush().context("flush feature csv")?;
    Ok(())
}

pub fn save_feature_rows(path: &Path, rows: &[EnrichedFeatureRow]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir {}", parent.display()))?;
    }
    let tmp = path.with_extension("csv.tmp");
    let file = File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
    write_feature_rows(file, rows)?;
    std::fs::rename(&tmp, path).with_context(|| format!("move output to {}", path.display()))?;
    Ok(())
}

fn push_side(out: &mut Vec<String>, stats: &SideStats) {
    out.extend(stats.iter().map(|v| v.map(fmt_f64).unwrap_or_default()));
}

fn fmt_f64(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.6}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_has_expected_shape() {
        let cols = column_names();
        // 5 identity, 16 raw, 48 form, 4 h2h, 4 rank/strength, 3 odds
        assert_eq!(cols.len(), 5 + 16 + 48 + 4 + 4 + 3);
        assert!(cols.contains(&"home_form_goals_for".to_string()));
        assert!(cols.contains(&"away_form_reds_against".to_string()));
        assert!(cols.contains(&"form_diff_corners_for".to_string()));
        assert!(cols.contains(&"home_strength".to_string()));
    }

    #[test]
    fn floats_format_compactly() {
        assert_eq!(fmt_f64(3.0), "3");
        assert_eq!(fmt_f64(1515.0), "1515");
        assert_eq!(fmt_f64(0.5), "0.500000");
    }
}
