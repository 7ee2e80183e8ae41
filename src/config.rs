use std::env;

use crate::elo::EloConfig;

pub const DEFAULT_FORM_WINDOW: usize = 5;
pub const DEFAULT_RANK_SENTINEL: u32 = 15;
pub const DEFAULT_FALLBACK_DRAW_RATE: f64 = 0.26;

/// Tunables for one feature-building run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub form_window: usize,
    pub elo: EloConfig,
    pub rank_sentinel: u32,
    pub fallback_draw_rate: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            form_window: DEFAULT_FORM_WINDOW,
            elo: EloConfig::default(),
            rank_sentinel: DEFAULT_RANK_SENTINEL,
            fallback_draw_rate: DEFAULT_FALLBACK_DRAW_RATE,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let form_window = env_parse::<usize>("FORM_WINDOW")
            .unwrap_or(defaults.form_window)
            .clamp(1, 20);
        let k = env_parse::<f64>("ELO_K")
            .unwrap_or(defaults.elo.k)
            .clamp(1.0, 100.0);
        let initial = env_parse::<f64>("ELO_INITIAL")
            .unwrap_or(defaults.elo.initial)
            .clamp(0.0, 4000.0);
        let rank_sentinel = env_parse::<u32>("RANK_SENTINEL")
            .unwrap_or(defaults.rank_sentinel)
            .clamp(1, 40);
        let fallback_draw_rate = env_parse::<f64>("FALLBACK_DRAW_RATE")
            .unwrap_or(defaults.fallback_draw_rate)
            .clamp(0.0, 0.6);

        Self {
            form_window,
            elo: EloConfig { k, initial },
            rank_sentinel,
            fallback_draw_rate,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<T>().ok())
}
