use crate::features::FeatureSummary;
use crate::headers::KnownSide;
use crate::spent::SpentTimeMode;
use crate::timecontrol::TimeControl;

/// Number of numeric model inputs produced per game.
pub const NUMERIC_FEATURE_COUNT: usize = 13;

/// Names of the numeric model inputs, in [`GameRecord::numeric_features`] order.
pub const NUMERIC_FEATURE_NAMES: [&str; NUMERIC_FEATURE_COUNT] = [
    "known_elo",
    "tc_initial",
    "tc_inc",
    "white_time_mean",
    "white_time_std",
    "white_time_max",
    "white_time_min",
    "white_time_total",
    "black_time_mean",
    "black_time_std",
    "black_time_max",
    "black_time_min",
    "black_time_total",
];

/// Knobs for turning a game into a [`GameRecord`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureConfig {
    pub known_side: KnownSide,
    pub spent_mode: SpentTimeMode,
}

/// One feature row per successfully processed game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub known_rating: u32,
    pub opening: String,
    pub time_control: TimeControl,
    pub white: FeatureSummary,
    pub black: FeatureSummary,
    pub target_rating: u32,
}

impl GameRecord {
    pub fn numeric_features(&self) -> [f64; NUMERIC_FEATURE_COUNT] {
        let mut out = [0.0; NUMERIC_FEATURE_COUNT];
        out[0] = f64::from(self.known_rating);
        out[1] = f64::from(self.time_control.initial);
        out[2] = f64::from(self.time_control.increment);
        out[3..8].copy_from_slice(&self.white.to_array());
        out[8..13].copy_from_slice(&self.black.to_array());
        out
    }
}
