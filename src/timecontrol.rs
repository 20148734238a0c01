use std::fmt;

use crate::error::FeatureError;

/// Initial allotment and per-move increment, both in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeControl {
    pub initial: u32,
    pub increment: u32,
}

impl TimeControl {
    /// Sentinel for games played without a clock (`-`).
    pub const UNLIMITED: Self = Self {
        initial: 0,
        increment: 0,
    };

    pub const fn new(initial: u32, increment: u32) -> Self {
        Self { initial, increment }
    }
}

impl fmt::Display for TimeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.initial, self.increment)
    }
}

fn parse_seconds(part: &str, raw: &str) -> Result<u32, FeatureError> {
    part.trim()
        .parse()
        .map_err(|_| FeatureError::MalformedTimeControl {
            value: raw.to_string(),
        })
}

/// Parse a PGN `TimeControl` value of the form `initial[+increment]`.
///
/// `-` means no time control. Stages beyond the second `+` part are ignored.
pub fn parse_time_control(raw: &str) -> Result<TimeControl, FeatureError> {
    if raw == "-" {
        return Ok(TimeControl::UNLIMITED);
    }

    let mut parts = raw.split('+');
    let initial = parse_seconds(parts.next().unwrap_or_default(), raw)?;
    let increment = match parts.next() {
        Some(part) => parse_seconds(part, raw)?,
        None => 0,
    };

    Ok(TimeControl { initial, increment })
}
