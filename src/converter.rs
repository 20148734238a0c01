use std::error::Error;

use duckdb::{
    Result,
    core::{DataChunkHandle, LogicalTypeHandle, LogicalTypeId},
    vscalar::{ScalarFunctionSignature, VScalar},
    vtab::arrow::WritableVector,
};
use serde_json::json;
use shakmaty::{CastlingMode, Chess, Color, Position, fen::Fen};

use crate::clock::parse_clock_comment;
use crate::duckdb_impl::scalar::{VarcharOutput, invoke_binary_varchar_varchar_to_varchar};
use crate::error::FeatureError;
use crate::features::{FeatureSummary, summarize};
use crate::headers::GameHeaders;
use crate::spent::{ClockReadings, SpentTimeMode, reconstruct_time_spent};
use crate::timecontrol::TimeControl;
use crate::types::{FeatureConfig, GameRecord};
use crate::visitor::{ParsedGame, parse_first_game};

/// Clock readings split by the side that made the move.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SideReadings {
    pub white: ClockReadings,
    pub black: ClockReadings,
}

fn starting_position(headers: &GameHeaders) -> Result<Chess, FeatureError> {
    let Some(raw) = headers.fen.as_deref() else {
        return Ok(Chess::default());
    };

    let invalid = || FeatureError::InvalidPosition {
        fen: raw.to_string(),
    };
    let fen: Fen = raw.trim().parse().map_err(|_| invalid())?;
    fen.into_position::<Chess>(CastlingMode::Standard)
        .map_err(|_| invalid())
}

/// Replay the mainline, crediting each parsable clock annotation to the
/// side that made the move. Moves without a clock still advance the game.
pub fn collect_clock_readings(game: &ParsedGame) -> Result<SideReadings, FeatureError> {
    let mut pos = starting_position(&game.headers)?;
    let mut readings = SideReadings::default();

    for (idx, annotated) in game.moves.iter().enumerate() {
        if let Some(seconds) = parse_clock_comment(&annotated.comment)? {
            match pos.turn() {
                Color::White => readings.white.push(seconds),
                Color::Black => readings.black.push(seconds),
            }
        }

        let m = annotated
            .san
            .san
            .to_move(&pos)
            .map_err(|_| FeatureError::IllegalMove {
                ply: idx + 1,
                san: annotated.san.to_string(),
            })?;
        pos.play_unchecked(m);
    }

    Ok(readings)
}

/// Summarize one side; a side without readings gets the zero vector and
/// the reconstructor is not run.
pub fn side_summary(
    readings: &[u32],
    time_control: TimeControl,
    mode: SpentTimeMode,
) -> FeatureSummary {
    if readings.is_empty() {
        return FeatureSummary::ZERO;
    }

    let spent = reconstruct_time_spent(
        readings,
        time_control.initial,
        time_control.increment,
        mode,
    );
    summarize(&spent)
}

/// Turn one parsed game into its feature record.
pub fn convert_game(game: &ParsedGame, config: &FeatureConfig) -> Result<GameRecord, FeatureError> {
    let headers = game.headers.resolve(config.known_side)?;
    let readings = collect_clock_readings(game)?;

    Ok(GameRecord {
        known_rating: headers.known_rating,
        opening: headers.opening,
        time_control: headers.time_control,
        white: side_summary(&readings.white, headers.time_control, config.spent_mode),
        black: side_summary(&readings.black, headers.time_control, config.spent_mode),
        target_rating: headers.target_rating,
    })
}

fn time_features_json(movetext: &str, timecontrol: &str) -> String {
    let result = (|| {
        let mut game = if movetext.trim().is_empty() {
            ParsedGame::default()
        } else {
            parse_first_game(movetext)?
        };
        game.headers.time_control = Some(timecontrol.to_string());
        convert_game(&game, &FeatureConfig::default())
    })();

    match result {
        Ok(record) => json!({
            "white": record.white.to_json(),
            "black": record.black.to_json(),
        })
        .to_string(),
        Err(e) => json!({ "error": e.to_string() }).to_string(),
    }
}

pub struct ChessTimeFeaturesScalar;

impl VScalar for ChessTimeFeaturesScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_binary_varchar_varchar_to_varchar(input, output, |movetext, timecontrol| {
            Ok(VarcharOutput::Value(time_features_json(movetext, timecontrol)))
        })
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        vec![ScalarFunctionSignature::exact(
            vec![
                LogicalTypeHandle::from(LogicalTypeId::Varchar),
                LogicalTypeHandle::from(LogicalTypeId::Varchar),
            ],
            LogicalTypeHandle::from(LogicalTypeId::Varchar),
        )]
    }
}
