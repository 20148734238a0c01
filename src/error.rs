use std::io;

use thiserror::Error;

/// Reasons a single game is dropped from the feature output.
///
/// Every variant aborts processing of the current game only; the batch
/// driver records it and moves on to the next game.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Malformed header: {tag}='{value}'")]
    MalformedHeader { tag: &'static str, value: String },

    #[error("Malformed time control: '{value}'")]
    MalformedTimeControl { value: String },

    #[error("Malformed clock token: '{token}'")]
    MalformedClockToken { token: String },

    #[error("Illegal move at ply {ply}: {san}")]
    IllegalMove { ply: usize, san: String },

    #[error("Invalid starting position: FEN='{fen}'")]
    InvalidPosition { fen: String },

    #[error("PGN read error: {0}")]
    Read(#[from] io::Error),

    #[error("No game found in PGN input")]
    NoGame,
}
