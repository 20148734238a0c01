//! Boundary to a trained rating model.
//!
//! Training, opening encoding and model persistence live outside this crate.
//! Callers load their model once, wrap it in an [`InferenceContext`] and
//! share that context read-only across requests.

use std::sync::Arc;

use crate::converter::convert_game;
use crate::error::FeatureError;
use crate::types::{FeatureConfig, GameRecord, NUMERIC_FEATURE_COUNT};
use crate::visitor::parse_first_game;

/// Model inputs for one game: the numeric columns plus the raw opening name,
/// which the model is responsible for encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub numeric: [f64; NUMERIC_FEATURE_COUNT],
    pub opening: String,
}

impl From<&GameRecord> for FeatureVector {
    fn from(record: &GameRecord) -> Self {
        Self {
            numeric: record.numeric_features(),
            opening: record.opening.clone(),
        }
    }
}

pub trait RatingModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingEstimate {
    pub predicted: f64,
    /// Target rating as recorded in the PGN headers (0 when absent).
    pub recorded: u32,
}

#[derive(Clone)]
pub struct InferenceContext {
    model: Arc<dyn RatingModel>,
    config: FeatureConfig,
}

impl InferenceContext {
    pub fn new(model: Arc<dyn RatingModel>, config: FeatureConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn estimate_record(&self, record: &GameRecord) -> RatingEstimate {
        RatingEstimate {
            predicted: self.model.predict(&FeatureVector::from(record)),
            recorded: record.target_rating,
        }
    }

    /// Estimate the opponent's rating from the first game in `pgn`.
    pub fn estimate(&self, pgn: &str) -> Result<RatingEstimate, FeatureError> {
        let game = parse_first_game(pgn)?;
        let record = convert_game(&game, &self.config)?;
        Ok(self.estimate_record(&record))
    }
}
