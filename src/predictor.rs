//! Narrow interface to a trained outcome model, plus the strength-only path
//! used when two teams have no head-to-head history.

use anyhow::{Result, bail};
use serde::Serialize;

use crate::calibration::Prob3;
use crate::elo::expected_score;
use crate::features::MatchFeatures;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictorOutput {
    Distribution(Prob3),
    Scalar(f64),
}

/// A fitted model. `feature_names` are the exact columns it was fitted on, in order.
pub trait Predictor {
    fn feature_names(&self) -> &[String];
    fn predict(&self, features: &[f64]) -> Result<PredictorOutput>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum MatchPrediction {
    Model { output: PredictorOutput },
    StrengthOnly { probs: Prob3 },
}

/// Three-way distribution from two ratings alone.
///
/// Draw mass is `draw_rate` at parity and shrinks linearly with the gap
/// between the expected scores; the rest follows the expected score.
#[derive(Debug, Clone, Copy)]
pub struct StrengthFallback {
    pub draw_rate: f64,
}

impl StrengthFallback {
    pub fn new(draw_rate: f64) -> Self {
        Self {
            draw_rate: draw_rate.clamp(0.0, 1.0),
        }
    }

    pub fn probs(&self, home_strength: f64, away_strength: f64) -> Prob3 {
        let e_home = expected_score(home_strength, away_strength);
        let draw = self.draw_rate * (1.0 - (2.0 * e_home - 1.0).abs());
        Prob3 {
            home: e_home - draw / 2.0,
            draw,
            away: (1.0 - e_home) - draw / 2.0,
        }
    }
}

pub fn predict_match(
    predictor: &dyn Predictor,
    features: &MatchFeatures,
    fallback: StrengthFallback,
) -> Result<MatchPrediction> {
    match features {
        MatchFeatures::Full(fv) => {
            let values = fv.select(predictor.feature_names())?;
            let output = predictor.predict(&values)?;
            match output {
                PredictorOutput::Distribution(p)
                    if !(p.home.is_finite() && p.draw.is_finite() && p.away.is_finite()) =>
                {
                    bail!("predictor returned a non-finite distribution {p:?}")
                }
                PredictorOutput::Scalar(v) if !v.is_finite() => {
                    bail!("predictor returned a non-finite value {v}")
                }
                _ => Ok(MatchPrediction::Model { output }),
            }
        }
        MatchFeatures::StrengthOnly {
            home_strength,
            away_strength,
        } => Ok(MatchPrediction::StrengthOnly {
            probs: fallback.probs(*home_strength, *away_strength),
        }),
    }
}

/// Merges a draw model with a win/loss model conditioned on a decisive result.
pub fn combine_draw_and_win_loss(p_draw: f64, home_if_decisive: f64, away_if_decisive: f64) -> Prob3 {
    let p_draw = p_draw.clamp(0.0, 1.0);
    Prob3 {
        home: home_if_decisive * (1.0 - p_draw),
        draw: p_draw,
        away: away_if_decisive * (1.0 - p_draw),
    }
    .normalized()
}

/// Baseline model over the two rating columns.
#[derive(Debug, Clone)]
pub struct StrengthPredictor {
    names: Vec<String>,
    fallback: StrengthFallback,
}

impl StrengthPredictor {
    pub fn new(draw_rate: f64) -> Self {
        Self {
            names: vec!["home_strength".to_string(), "away_strength".to_string()],
            fallback: StrengthFallback::new(draw_rate),
        }
    }
}

impl Predictor for StrengthPredictor {
    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn predict(&self, features: &[f64]) -> Result<PredictorOutput> {
        let [home, away] = features else {
            bail!("expected 2 features, got {}", features.len());
        };
        Ok(PredictorOutput::Distribution(self.fallback.probs(*home, *away)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;

    struct RankGap {
        names: Vec<String>,
    }

    impl Predictor for RankGap {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn predict(&self, features: &[f64]) -> Result<PredictorOutput> {
            Ok(PredictorOutput::Scalar(features[1] - features[0]))
        }
    }

    fn rank_gap() -> RankGap {
        RankGap {
            names: vec!["home_rank".to_string(), "away_rank".to_string()],
        }
    }

    #[test]
    fn fallback_is_a_distribution() {
        let fb = StrengthFallback::new(0.26);
        for (h, a) in [(1500.0, 1500.0), (1800.0, 1300.0), (1100.0, 1900.0)] {
            let p = fb.probs(h, a);
            assert!((p.home + p.draw + p.away - 1.0).abs() < 1e-12);
            assert!(p.home >= 0.0 && p.away >= 0.0 && p.draw >= 0.0);
        }
        let even = fb.probs(1500.0, 1500.0);
        assert!((even.draw - 0.26).abs() < 1e-12);
        assert!((even.home - even.away).abs() < 1e-12);
        assert!(fb.probs(1700.0, 1500.0).home > fb.probs(1600.0, 1500.0).home);
    }

    #[test]
    fn full_features_go_through_the_model() {
        let mut fv = FeatureVector::default();
        fv.insert("home_rank", 2.0);
        fv.insert("away_rank", 9.0);
        fv.insert("home_strength", 1600.0);
        let out = predict_match(
            &rank_gap(),
            &MatchFeatures::Full(fv),
            StrengthFallback::new(0.26),
        )
        .unwrap();
        assert_eq!(
            out,
            MatchPrediction::Model {
                output: PredictorOutput::Scalar(7.0)
            }
        );
    }

    #[test]
    fn missing_fitted_column_is_an_error() {
        let mut fv = FeatureVector::default();
        fv.insert("home_rank", 2.0);
        let res = predict_match(
            &rank_gap(),
            &MatchFeatures::Full(fv),
            StrengthFallback::new(0.26),
        );
        assert!(res.is_err());
    }

    #[test]
    fn strength_only_skips_the_model() {
        let out = predict_match(
            &rank_gap(),
            &MatchFeatures::StrengthOnly {
                home_strength: 1500.0,
                away_strength: 1500.0,
            },
            StrengthFallback::new(0.3),
        )
        .unwrap();
        let MatchPrediction::StrengthOnly { probs } = out else {
            panic!("expected the strength-only path");
        };
        assert!((probs.draw - 0.3).abs() < 1e-12);
    }

    #[test]
    fn two_stage_combination_normalizes() {
        let p = combine_draw_and_win_loss(0.25, 0.6, 0.4);
        assert!((p.draw - 0.25).abs() < 1e-12);
        assert!((p.home - 0.45).abs() < 1e-12);
        assert!((p.away - 0.30).abs() < 1e-12);

        let skewed = combine_draw_and_win_loss(0.2, 0.9, 0.3);
        assert!((skewed.home + skewed.draw + skewed.away - 1.0).abs() < 1e-12);
    }

    #[test]
    fn strength_predictor_checks_arity() {
        let model = StrengthPredictor::new(0.26);
        assert!(model.predict(&[1500.0]).is_err());
        assert!(matches!(
            model.predict(&[1500.0, 1400.0]).unwrap(),
            PredictorOutput::Distribution(_)
        ));
    }
}
