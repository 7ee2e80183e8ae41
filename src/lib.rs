pub mod calibration;
pub mod config;
pub mod elo;
pub mod feature_export;
pub mod features;
pub mod form;
pub mod head_to_head;
pub mod historical_dataset;
pub mod predictor;
pub mod standings;
