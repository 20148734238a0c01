use std::fmt;
use std::str::FromStr;

use pgn_reader::RawTag;

use crate::error::FeatureError;
use crate::timecontrol::{TimeControl, parse_time_control};

const DEFAULT_OPENING: &str = "Unknown";
const DEFAULT_TIME_CONTROL: &str = "0+0";

/// Which player's rating is treated as known; the other one is the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KnownSide {
    #[default]
    White,
    Black,
}

impl KnownSide {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }
}

impl fmt::Display for KnownSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnownSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim();
        if normalized.eq_ignore_ascii_case("white") {
            Ok(Self::White)
        } else if normalized.eq_ignore_ascii_case("black") {
            Ok(Self::Black)
        } else {
            Err(format!(
                "Invalid known_side value '{}'. Supported values: 'white' or 'black'.",
                normalized
            ))
        }
    }
}

/// Header tags the feature pipeline reads. Absent tags stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameHeaders {
    pub white_elo: Option<String>,
    pub black_elo: Option<String>,
    pub opening: Option<String>,
    pub time_control: Option<String>,
    pub fen: Option<String>,
}

/// Header values after defaults have been applied and numbers parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHeaders {
    pub known_rating: u32,
    pub target_rating: u32,
    pub opening: String,
    pub time_control: TimeControl,
}

impl GameHeaders {
    /// Record a tag value. The first occurrence of a tag wins; unrelated
    /// tags are ignored.
    pub fn set_known_tag(&mut self, key: &[u8], value: RawTag<'_>) {
        let slot = match key {
            b"WhiteElo" => &mut self.white_elo,
            b"BlackElo" => &mut self.black_elo,
            b"Opening" => &mut self.opening,
            b"TimeControl" => &mut self.time_control,
            b"FEN" => &mut self.fen,
            _ => return,
        };

        if slot.is_none() {
            *slot = Some(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
    }

    fn rating(tag: &'static str, raw: Option<&str>) -> Result<u32, FeatureError> {
        match raw {
            None => Ok(0),
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| FeatureError::MalformedHeader {
                    tag,
                    value: value.to_string(),
                }),
        }
    }

    /// Apply defaults (`0` ratings, `"Unknown"` opening, `"0+0"` time
    /// control) and parse the numeric fields.
    pub fn resolve(&self, known_side: KnownSide) -> Result<ResolvedHeaders, FeatureError> {
        let white = Self::rating("WhiteElo", self.white_elo.as_deref())?;
        let black = Self::rating("BlackElo", self.black_elo.as_deref())?;
        let time_control = parse_time_control(
            self.time_control
                .as_deref()
                .unwrap_or(DEFAULT_TIME_CONTROL),
        )?;

        let (known_rating, target_rating) = match known_side {
            KnownSide::White => (white, black),
            KnownSide::Black => (black, white),
        };

        Ok(ResolvedHeaders {
            known_rating,
            target_rating,
            opening: self
                .opening
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENING.to_string()),
            time_control,
        })
    }
}
