use std::io::Read;

use pgn_reader::Reader;
use tracing::{debug, warn};

use crate::converter::convert_game;
use crate::error::FeatureError;
use crate::types::{FeatureConfig, GameRecord};
use crate::visitor::{GameVisitor, ParsedGame};

/// A game that was dropped, with its 1-based position in the input.
#[derive(Debug)]
pub struct GameFailure {
    pub game_index: usize,
    pub error: FeatureError,
}

pub type GameOutcome = Result<GameRecord, GameFailure>;

#[derive(Debug, Default)]
pub struct BatchReport {
    pub records: Vec<GameRecord>,
    pub failures: Vec<GameFailure>,
}

impl BatchReport {
    fn push(&mut self, outcome: GameOutcome) {
        match outcome {
            Ok(record) => self.records.push(record),
            Err(failure) => {
                warn!(
                    game_index = failure.game_index,
                    error = %failure.error,
                    "skipping game"
                );
                self.failures.push(failure);
            }
        }
    }

    pub fn total(&self) -> usize {
        self.records.len() + self.failures.len()
    }
}

/// Convert one game, tagging any failure with its position.
pub fn process_game(game_index: usize, game: &ParsedGame, config: &FeatureConfig) -> GameOutcome {
    convert_game(game, config).map_err(|error| GameFailure { game_index, error })
}

/// Convert every game independently, keeping the successes.
pub fn process_games<I>(games: I, config: &FeatureConfig) -> BatchReport
where
    I: IntoIterator<Item = ParsedGame>,
{
    let mut report = BatchReport::default();
    for (idx, game) in games.into_iter().enumerate() {
        report.push(process_game(idx + 1, &game, config));
    }
    debug!(
        records = report.records.len(),
        failures = report.failures.len(),
        "batch finished"
    );
    report
}

/// Stream games out of a PGN source and convert each one.
///
/// A read error from the source is charged to the game being read and ends
/// the stream.
pub fn process_pgn<R: Read>(input: R, config: &FeatureConfig) -> BatchReport {
    let mut reader = Reader::new(input);
    let mut visitor = GameVisitor::new();
    let mut report = BatchReport::default();
    let mut game_index = 1;

    loop {
        let outcome = match reader.read_game(&mut visitor) {
            Ok(Some(game)) => process_game(game_index, &game, config),
            Ok(None) => break,
            Err(error) => {
                report.push(Err(GameFailure {
                    game_index,
                    error: error.into(),
                }));
                break;
            }
        };
        report.push(outcome);
        game_index += 1;
    }

    debug!(
        records = report.records.len(),
        failures = report.failures.len(),
        "batch finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visitor::parse_first_game;

    fn pgn_game(white_elo: &str, black_elo: &str) -> String {
        format!(
            r#"[WhiteElo "{white_elo}"]
[BlackElo "{black_elo}"]
[TimeControl "180+0"]

1. e4 {{ [%clk 0:02:55] }} e5 {{ [%clk 0:02:50] }} *

"#
        )
    }

    #[test]
    fn test_bad_elo_game_is_isolated() {
        let mut pgn = String::new();
        pgn.push_str(&pgn_game("1500", "1510"));
        pgn.push_str(&pgn_game("1600", "1610"));
        pgn.push_str(&pgn_game("abc", "1710"));
        pgn.push_str(&pgn_game("1800", "1810"));
        pgn.push_str(&pgn_game("1900", "1910"));

        let report = process_pgn(pgn.as_bytes(), &FeatureConfig::default());

        assert_eq!(report.total(), 5);
        assert_eq!(report.records.len(), 4);
        assert_eq!(
            report
                .records
                .iter()
                .map(|r| r.known_rating)
                .collect::<Vec<_>>(),
            vec![1500, 1600, 1800, 1900]
        );
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].game_index, 3);
        assert!(matches!(
            report.failures[0].error,
            FeatureError::MalformedHeader { tag: "WhiteElo", .. }
        ));
    }

    #[test]
    fn test_every_failure_kind_is_isolated() {
        let pgn = r#"[TimeControl "blitz"]
1. e4 *

1. e4 { [%clk 0:01:00] } e5 2. Kd8 *

[WhiteElo "1200"]
1. d4 { [%clk 0:01:00] } *
"#;

        let report = process_pgn(pgn.as_bytes(), &FeatureConfig::default());
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].known_rating, 1200);
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(
            report.failures[0].error,
            FeatureError::MalformedTimeControl { .. }
        ));
        assert!(matches!(
            report.failures[1].error,
            FeatureError::IllegalMove { .. }
        ));
    }

    #[test]
    fn test_overflowing_clock_token_is_isolated() {
        let mut pgn = String::new();
        pgn.push_str(&pgn_game("1500", "1510"));
        pgn.push_str(
            r#"[WhiteElo "1600"]
[BlackElo "1610"]
[TimeControl "180+0"]

1. e4 { [%clk 99999999:00:00] } e5 { [%clk 0:02:50] } *

"#,
        );
        pgn.push_str(&pgn_game("1700", "1710"));

        let report = process_pgn(pgn.as_bytes(), &FeatureConfig::default());

        assert_eq!(
            report
                .records
                .iter()
                .map(|r| r.known_rating)
                .collect::<Vec<_>>(),
            vec![1500, 1700]
        );
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].game_index, 2);
        assert!(matches!(
            report.failures[0].error,
            FeatureError::MalformedClockToken { ref token } if token == "99999999:00:00"
        ));
    }

    struct BrokenSource;

    impl Read for BrokenSource {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("device unplugged"))
        }
    }

    #[test]
    fn test_read_error_is_charged_to_current_game_and_stops() {
        let report = process_pgn(BrokenSource, &FeatureConfig::default());

        assert!(report.records.is_empty());
        assert_eq!(report.total(), 1);
        assert_eq!(report.failures[0].game_index, 1);
        assert!(matches!(report.failures[0].error, FeatureError::Read(_)));
        assert!(report.failures[0].error.to_string().contains("device unplugged"));
    }

    #[test]
    fn test_process_games_from_parsed_input() {
        let games = vec![
            parse_first_game(&pgn_game("1000", "1100")).unwrap(),
            parse_first_game(&pgn_game("?", "1100")).unwrap(),
        ];

        let report = process_games(games, &FeatureConfig::default());
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].target_rating, 1100);
        assert_eq!(report.failures[0].game_index, 2);
    }

    #[test]
    fn test_empty_input_yields_empty_report() {
        let report = process_pgn("".as_bytes(), &FeatureConfig::default());
        assert!(report.records.is_empty());
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_process_game_success() {
        let game = parse_first_game(&pgn_game("1500", "1400")).unwrap();
        let record = process_game(1, &game, &FeatureConfig::default()).unwrap();
        assert_eq!(record.white.sum, 5.0);
        assert_eq!(record.black.sum, 10.0);
    }
}
