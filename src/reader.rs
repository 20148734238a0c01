use std::borrow::Cow;
use std::error::Error;
use std::ffi::CString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use duckdb::{
    core::{DataChunkHandle, Inserter, LogicalTypeHandle, LogicalTypeId},
    vtab::{BindInfo, InitInfo, TableFunctionInfo, VTab},
};
use tracing::{debug, warn};
use zstd::stream::read::Decoder as ZstdDecoder;

use crate::batch::process_game;
use crate::duckdb_impl::params::get_named_parameter_varchar;
use crate::features::FeatureSummary;
use crate::headers::KnownSide;
use crate::spent::SpentTimeMode;
use crate::types::{FeatureConfig, GameRecord};
use crate::visitor::{PgnInput, PgnReaderState, SharedState};

#[repr(C)]
pub struct ReadPgnFeaturesBindData {
    paths: Vec<PathBuf>,
    compression: CompressionMode,
    config: FeatureConfig,
}

#[repr(C)]
pub struct ReadPgnFeaturesInitData {
    state: Mutex<SharedState>,
}

pub struct ReadPgnFeaturesVTab;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum CompressionMode {
    Plain,
    Zstd,
}

impl FromStr for CompressionMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim();
        if normalized.eq_ignore_ascii_case("zstd") {
            Ok(Self::Zstd)
        } else {
            Err(format!(
                "Invalid compression value '{}'. Supported values: 'zstd' or NULL/omitted.",
                normalized
            ))
        }
    }
}

const PATH_PATTERN_PARAM_INDEX: u64 = 0;
const ROWS_PER_CHUNK: usize = 2048;
const READ_PGN_FEATURES_COLUMN_COUNT: usize = 15;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum FeatureColumn {
    KnownElo = 0,
    Opening = 1,
    TcInitial = 2,
    TcIncrement = 3,
    WhiteTimeMean = 4,
    BlackTimeMean = 9,
    TargetElo = 14,
}

impl FeatureColumn {
    const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum FeatureLogicalType {
    Varchar,
    UInteger,
    Double,
}

impl FeatureLogicalType {
    fn to_handle(self) -> LogicalTypeHandle {
        match self {
            Self::Varchar => LogicalTypeHandle::from(LogicalTypeId::Varchar),
            Self::UInteger => LogicalTypeHandle::from(LogicalTypeId::UInteger),
            Self::Double => LogicalTypeHandle::from(LogicalTypeId::Double),
        }
    }
}

struct FeatureColumnDef {
    name: &'static str,
    logical_type: FeatureLogicalType,
}

const fn column(name: &'static str, logical_type: FeatureLogicalType) -> FeatureColumnDef {
    FeatureColumnDef { name, logical_type }
}

const READ_PGN_FEATURES_COLUMNS: [FeatureColumnDef; READ_PGN_FEATURES_COLUMN_COUNT] = [
    column("KnownElo", FeatureLogicalType::UInteger),
    column("Opening", FeatureLogicalType::Varchar),
    column("TcInitial", FeatureLogicalType::UInteger),
    column("TcIncrement", FeatureLogicalType::UInteger),
    column("white_time_mean", FeatureLogicalType::Double),
    column("white_time_std", FeatureLogicalType::Double),
    column("white_time_max", FeatureLogicalType::Double),
    column("white_time_min", FeatureLogicalType::Double),
    column("white_time_total", FeatureLogicalType::Double),
    column("black_time_mean", FeatureLogicalType::Double),
    column("black_time_std", FeatureLogicalType::Double),
    column("black_time_max", FeatureLogicalType::Double),
    column("black_time_min", FeatureLogicalType::Double),
    column("black_time_total", FeatureLogicalType::Double),
    column("TargetElo", FeatureLogicalType::UInteger),
];

fn open_input_stream(path: &Path, compression: CompressionMode) -> Result<PgnInput, String> {
    let file =
        File::open(path).map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

    match compression {
        CompressionMode::Plain => Ok(Box::new(file)),
        CompressionMode::Zstd => ZstdDecoder::new(file)
            .map(|decoder| Box::new(decoder) as PgnInput)
            .map_err(|e| {
                format!(
                    "Failed to initialize zstd decoder for '{}': {}",
                    path.display(),
                    e
                )
            }),
    }
}

fn sanitize_for_cstring(value: &str) -> Cow<'_, str> {
    if value.contains('\0') {
        Cow::Owned(value.replace('\0', " "))
    } else {
        Cow::Borrowed(value)
    }
}

fn lock_state(
    init_data: &ReadPgnFeaturesInitData,
) -> Result<MutexGuard<'_, SharedState>, Box<dyn Error>> {
    init_data
        .state
        .lock()
        .map_err(|_| "read_pgn_features reader state lock poisoned".into())
}

enum ReadNextGameOutcome {
    GameReady(GameRecord),
    ReaderFinished,
}

struct ChunkWriter<'a> {
    output: &'a mut DataChunkHandle,
    row_count: usize,
}

impl<'a> ChunkWriter<'a> {
    fn new(output: &'a mut DataChunkHandle) -> Self {
        Self {
            output,
            row_count: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.row_count >= ROWS_PER_CHUNK
    }

    fn write_row(&mut self, game: &GameRecord) -> Result<(), Box<dyn Error>> {
        let row_idx = self.row_count;

        self.write_uinteger(FeatureColumn::KnownElo, row_idx, game.known_rating);
        let opening = sanitize_for_cstring(&game.opening);
        self.output
            .flat_vector(FeatureColumn::Opening.index())
            .insert(row_idx, CString::new(opening.as_ref())?);
        self.write_uinteger(FeatureColumn::TcInitial, row_idx, game.time_control.initial);
        self.write_uinteger(
            FeatureColumn::TcIncrement,
            row_idx,
            game.time_control.increment,
        );
        self.write_summary(FeatureColumn::WhiteTimeMean, row_idx, game.white);
        self.write_summary(FeatureColumn::BlackTimeMean, row_idx, game.black);
        self.write_uinteger(FeatureColumn::TargetElo, row_idx, game.target_rating);

        self.row_count += 1;
        Ok(())
    }

    fn set_output_len(&mut self) {
        self.output.set_len(self.row_count);
    }

    fn write_uinteger(&mut self, column: FeatureColumn, row_idx: usize, value: u32) {
        let mut vector = self.output.flat_vector(column.index());
        vector.as_mut_slice::<u32>()[row_idx] = value;
    }

    /// Writes the five summary columns starting at `first`.
    fn write_summary(&mut self, first: FeatureColumn, row_idx: usize, summary: FeatureSummary) {
        for (offset, value) in summary.to_array().into_iter().enumerate() {
            let mut vector = self.output.flat_vector(first.index() + offset);
            vector.as_mut_slice::<f64>()[row_idx] = value;
        }
    }
}

fn acquire_reader(
    init_data: &ReadPgnFeaturesInitData,
    bind_data: &ReadPgnFeaturesBindData,
) -> Result<Option<PgnReaderState>, Box<dyn Error>> {
    loop {
        let path_idx = {
            let mut state = lock_state(init_data)?;

            if let Some(reader) = state.available_readers.pop() {
                return Ok(Some(reader));
            }

            if state.next_path_idx < bind_data.paths.len() {
                let path_idx = state.next_path_idx;
                state.next_path_idx += 1;
                path_idx
            } else {
                return Ok(None);
            }
        };

        let path = &bind_data.paths[path_idx];
        match open_input_stream(path, bind_data.compression) {
            Ok(input_stream) => {
                debug!(file = %path.display(), "opened PGN input");
                return Ok(Some(PgnReaderState::new(input_stream, path_idx)));
            }
            Err(err_msg) => {
                if bind_data.paths.len() == 1 {
                    return Err(err_msg.into());
                }

                warn!("{}", err_msg);
            }
        }
    }
}

/// Advance to the next game that converts cleanly. Failed games are logged
/// and skipped; a stream error ends this reader.
fn read_next_game(
    reader: &mut PgnReaderState,
    source_path: &Path,
    config: &FeatureConfig,
) -> ReadNextGameOutcome {
    loop {
        let game_index = reader.next_game_index;

        match reader.pgn_reader.read_game(&mut reader.visitor) {
            Ok(Some(game)) => {
                reader.next_game_index += 1;
                match process_game(game_index, &game, config) {
                    Ok(record) => return ReadNextGameOutcome::GameReady(record),
                    Err(failure) => warn!(
                        file = %source_path.display(),
                        game_index = failure.game_index,
                        error = %failure.error,
                        "skipping game"
                    ),
                }
            }
            Ok(None) => return ReadNextGameOutcome::ReaderFinished,
            Err(error) => {
                warn!(
                    file = %source_path.display(),
                    game_index,
                    error = %error,
                    "PGN read error, abandoning file"
                );
                return ReadNextGameOutcome::ReaderFinished;
            }
        }
    }
}

fn finalize_chunk(
    init_data: &ReadPgnFeaturesInitData,
    current_reader_state: Option<PgnReaderState>,
    chunk_writer: &mut ChunkWriter<'_>,
) -> Result<(), Box<dyn Error>> {
    if let Some(reader) = current_reader_state {
        lock_state(init_data)?.available_readers.push(reader);
    }

    chunk_writer.set_output_len();
    Ok(())
}

fn expand_paths(pattern: &str) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    if pattern.contains('*') || pattern.contains('?') {
        Ok(glob::glob(pattern)?.filter_map(|entry| entry.ok()).collect())
    } else {
        Ok(vec![PathBuf::from(pattern)])
    }
}

impl VTab for ReadPgnFeaturesVTab {
    type InitData = ReadPgnFeaturesInitData;
    type BindData = ReadPgnFeaturesBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let pattern = bind.get_parameter(PATH_PATTERN_PARAM_INDEX).to_string();
        let compression = get_named_parameter_varchar(bind, "compression")?
            .parse_or_default(CompressionMode::Plain)?;
        let config = FeatureConfig {
            known_side: get_named_parameter_varchar(bind, "known_side")?
                .parse_or_default(KnownSide::default())?,
            spent_mode: get_named_parameter_varchar(bind, "spent_mode")?
                .parse_or_default(SpentTimeMode::default())?,
        };

        let paths = expand_paths(&pattern)?;

        for column in READ_PGN_FEATURES_COLUMNS.iter() {
            bind.add_result_column(column.name, column.logical_type.to_handle());
        }

        Ok(ReadPgnFeaturesBindData {
            paths,
            compression,
            config,
        })
    }

    fn init(_: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        Ok(ReadPgnFeaturesInitData {
            state: Mutex::new(SharedState {
                next_path_idx: 0,
                available_readers: Vec::new(),
            }),
        })
    }

    fn func(
        func: &TableFunctionInfo<Self>,
        output: &mut DataChunkHandle,
    ) -> Result<(), Box<dyn Error>> {
        let init_data = func.get_init_data();
        let bind_data = func.get_bind_data();
        let mut chunk_writer = ChunkWriter::new(output);
        let mut current_reader_state: Option<PgnReaderState> = None;

        while !chunk_writer.is_full() {
            if current_reader_state.is_none() {
                current_reader_state = acquire_reader(init_data, bind_data)?;
                if current_reader_state.is_none() {
                    break;
                }
            }

            if let Some(mut reader) = current_reader_state.take() {
                let source_path = &bind_data.paths[reader.path_idx];
                match read_next_game(&mut reader, source_path, &bind_data.config) {
                    ReadNextGameOutcome::GameReady(record) => {
                        chunk_writer.write_row(&record)?;
                        current_reader_state = Some(reader);
                    }
                    ReadNextGameOutcome::ReaderFinished => {}
                }
            }
        }

        finalize_chunk(init_data, current_reader_state, &mut chunk_writer)
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        Some(vec![
            LogicalTypeHandle::from(LogicalTypeId::Varchar), // path pattern (required)
        ])
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(
            ["compression", "known_side", "spent_mode"]
                .into_iter()
                .map(|name| {
                    (
                        name.to_string(),
                        LogicalTypeHandle::from(LogicalTypeId::Varchar),
                    )
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NUMERIC_FEATURE_NAMES;
    use std::io::Write;

    #[test]
    fn test_read_pgn_features_columns_match_contract() {
        let expected: [(&str, FeatureLogicalType); READ_PGN_FEATURES_COLUMN_COUNT] = [
            ("KnownElo", FeatureLogicalType::UInteger),
            ("Opening", FeatureLogicalType::Varchar),
            ("TcInitial", FeatureLogicalType::UInteger),
            ("TcIncrement", FeatureLogicalType::UInteger),
            ("white_time_mean", FeatureLogicalType::Double),
            ("white_time_std", FeatureLogicalType::Double),
            ("white_time_max", FeatureLogicalType::Double),
            ("white_time_min", FeatureLogicalType::Double),
            ("white_time_total", FeatureLogicalType::Double),
            ("black_time_mean", FeatureLogicalType::Double),
            ("black_time_std", FeatureLogicalType::Double),
            ("black_time_max", FeatureLogicalType::Double),
            ("black_time_min", FeatureLogicalType::Double),
            ("black_time_total", FeatureLogicalType::Double),
            ("TargetElo", FeatureLogicalType::UInteger),
        ];

        for (idx, column) in READ_PGN_FEATURES_COLUMNS.iter().enumerate() {
            assert_eq!(column.name, expected[idx].0);
            assert_eq!(column.logical_type, expected[idx].1);
        }
    }

    #[test]
    fn test_summary_columns_line_up_with_feature_names() {
        for offset in 0..5 {
            assert_eq!(
                READ_PGN_FEATURES_COLUMNS[FeatureColumn::WhiteTimeMean.index() + offset].name,
                NUMERIC_FEATURE_NAMES[3 + offset]
            );
            assert_eq!(
                READ_PGN_FEATURES_COLUMNS[FeatureColumn::BlackTimeMean.index() + offset].name,
                NUMERIC_FEATURE_NAMES[8 + offset]
            );
        }
        assert_eq!(FeatureColumn::TargetElo.index(), READ_PGN_FEATURES_COLUMN_COUNT - 1);
    }

    #[test]
    fn test_rows_per_chunk_constant_matches_contract() {
        assert_eq!(ROWS_PER_CHUNK, 2048);
    }

    #[test]
    fn test_sanitize_for_cstring() {
        assert_eq!(sanitize_for_cstring("Ruy Lopez").as_ref(), "Ruy Lopez");
        assert_eq!(sanitize_for_cstring("A\0B").as_ref(), "A B");
    }

    #[test]
    fn test_parse_compression_mode_zstd_case_insensitive() {
        assert_eq!("zstd".parse::<CompressionMode>(), Ok(CompressionMode::Zstd));
        assert_eq!("ZsTd".parse::<CompressionMode>(), Ok(CompressionMode::Zstd));
    }

    #[test]
    fn test_parse_compression_mode_rejects_empty_and_unsupported() {
        assert!(
            "   "
                .parse::<CompressionMode>()
                .unwrap_err()
                .contains("Invalid compression value ''")
        );
        assert!(
            "gzip"
                .parse::<CompressionMode>()
                .unwrap_err()
                .contains("Invalid compression value 'gzip'")
        );
    }

    #[test]
    fn test_shared_state_initialization() {
        let init_data = ReadPgnFeaturesInitData {
            state: Mutex::new(SharedState {
                next_path_idx: 0,
                available_readers: Vec::new(),
            }),
        };
        let state = lock_state(&init_data).unwrap();
        assert_eq!(state.next_path_idx, 0);
        assert!(state.available_readers.is_empty());
    }

    #[test]
    fn test_expand_plain_path_is_kept_verbatim() {
        assert_eq!(
            expand_paths("games.pgn").unwrap(),
            vec![PathBuf::from("games.pgn")]
        );
    }

    fn temp_pgn(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "chess_elo_features_{}_{}",
            std::process::id(),
            name
        ));
        let mut file = File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    const GAMES: &str = r#"[WhiteElo "1500"]
[BlackElo "1520"]
[TimeControl "60+0"]

1. e4 { [%clk 0:00:58] } e5 { [%clk 0:00:57] } *

[WhiteElo "??"]

1. d4 *

[WhiteElo "1700"]
[BlackElo "1720"]
[Opening "Queen's Pawn Game"]

1. d4 d5 *
"#;

    #[test]
    fn test_read_next_game_skips_failed_games() {
        let path = temp_pgn("skip.pgn", GAMES.as_bytes());
        let input = open_input_stream(&path, CompressionMode::Plain).unwrap();
        let mut reader = PgnReaderState::new(input, 0);
        let config = FeatureConfig::default();

        let ReadNextGameOutcome::GameReady(first) = read_next_game(&mut reader, &path, &config)
        else {
            panic!("expected first game");
        };
        assert_eq!(first.known_rating, 1500);
        assert_eq!(first.white.sum, 2.0);
        assert_eq!(first.black.sum, 3.0);

        let ReadNextGameOutcome::GameReady(second) = read_next_game(&mut reader, &path, &config)
        else {
            panic!("expected third game");
        };
        assert_eq!(second.known_rating, 1700);
        assert_eq!(second.opening, "Queen's Pawn Game");
        assert_eq!(reader.next_game_index, 4);

        assert!(matches!(
            read_next_game(&mut reader, &path, &config),
            ReadNextGameOutcome::ReaderFinished
        ));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_zstd_input_stream() {
        let compressed = zstd::stream::encode_all(GAMES.as_bytes(), 0).unwrap();
        let path = temp_pgn("games.pgn.zst", &compressed);
        let input = open_input_stream(&path, CompressionMode::Zstd).unwrap();
        let mut reader = PgnReaderState::new(input, 0);

        assert!(matches!(
            read_next_game(&mut reader, &path, &FeatureConfig::default()),
            ReadNextGameOutcome::GameReady(_)
        ));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_open_missing_file_reports_path() {
        let err = match open_input_stream(Path::new("/nonexistent/games.pgn"), CompressionMode::Plain)
        {
            Ok(_) => panic!("expected open failure"),
            Err(err) => err,
        };
        assert!(err.contains("Failed to open file '/nonexistent/games.pgn'"));
    }
}
