use std::io::Read;
use std::ops::ControlFlow;

use pgn_reader::{RawComment, RawTag, Reader, SanPlus, Skip, Visitor};

use crate::error::FeatureError;
use crate::headers::GameHeaders;

/// One mainline move and the text of the comments that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedMove {
    pub san: SanPlus,
    pub comment: String,
}

/// Headers and mainline of a single PGN game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedGame {
    pub headers: GameHeaders,
    pub moves: Vec<AnnotatedMove>,
}

impl ParsedGame {
    fn push_comment_text(&mut self, text: &str, continues_previous: bool) {
        // Comments ahead of the first move carry no clock for anyone.
        let Some(last) = self.moves.last_mut() else {
            return;
        };

        let text = if continues_previous { text } else { text.trim() };
        if text.is_empty() {
            return;
        }

        if !continues_previous && !last.comment.is_empty() {
            last.comment.push(' ');
        }
        last.comment.push_str(text);
    }
}

/// Streaming PGN visitor (pgn-reader) collecting what the feature pipeline
/// needs: the relevant header tags and the mainline SAN moves with their
/// comments. Variations are skipped.
#[derive(Default)]
pub struct GameVisitor {
    in_partial_comment: bool,
}

impl GameVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn append_comment(&mut self, game: &mut ParsedGame, comment: RawComment<'_>, partial: bool) {
        let text = String::from_utf8_lossy(comment.as_bytes());
        game.push_comment_text(&text, self.in_partial_comment);
        self.in_partial_comment = partial;
    }
}

impl Visitor for GameVisitor {
    type Tags = GameHeaders;
    type Movetext = ParsedGame;
    type Output = ParsedGame;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        self.in_partial_comment = false;
        ControlFlow::Continue(GameHeaders::default())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        tags.set_known_tag(key, value);
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(ParsedGame {
            headers: tags,
            moves: Vec::with_capacity(128),
        })
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        self.in_partial_comment = false;
        movetext.moves.push(AnnotatedMove {
            san,
            comment: String::new(),
        });
        ControlFlow::Continue(())
    }

    fn partial_comment(
        &mut self,
        movetext: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        self.append_comment(movetext, comment, true);
        ControlFlow::Continue(())
    }

    fn comment(
        &mut self,
        movetext: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        self.append_comment(movetext, comment, false);
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        movetext
    }
}

/// Parse the first game of an in-memory PGN text.
pub fn parse_first_game(pgn: &str) -> Result<ParsedGame, FeatureError> {
    if pgn.trim().is_empty() {
        return Err(FeatureError::NoGame);
    }

    let mut reader = Reader::new(pgn.as_bytes());
    let mut visitor = GameVisitor::new();
    reader.read_game(&mut visitor)?.ok_or(FeatureError::NoGame)
}

pub type PgnInput = Box<dyn Read + Send>;

/// Per-file streaming state handed between DuckDB worker threads.
pub struct PgnReaderState {
    pub pgn_reader: Reader<PgnInput>,
    pub path_idx: usize,
    pub next_game_index: usize,
    pub visitor: GameVisitor,
}

impl PgnReaderState {
    pub fn new(input: PgnInput, path_idx: usize) -> Self {
        Self {
            pgn_reader: Reader::new(input),
            path_idx,
            next_game_index: 1,
            visitor: GameVisitor::new(),
        }
    }
}

pub struct SharedState {
    pub next_path_idx: usize,
    pub available_readers: Vec<PgnReaderState>,
}
