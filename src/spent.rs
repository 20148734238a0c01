//! Per-move time-spent reconstruction from absolute clock readings.
//!
//! Clock annotations record what is left on a player's clock after a move,
//! with the increment already added. The seconds actually spent thinking on
//! move `k` are therefore `clock_before + increment - reading_k`, where
//! `clock_before` depends on which walk is selected (see [`SpentTimeMode`]).
//! Values are never clamped: annotation noise or manual clock adjustments
//! can produce negative entries, and those are kept as recorded.

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

/// Per-side clock readings in play order.
pub type ClockReadings = SmallVec<[u32; 128]>;

/// Which clock value a reading is subtracted from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpentTimeMode {
    /// Seed the reverse walk with the initial allotment at the last move and
    /// carry each reading back to the move before it. Trained rating models
    /// expect features built this way.
    #[default]
    ReverseSeeded,
    /// The previous reading of the same side, or the initial allotment for
    /// that side's first move.
    Elapsed,
}

impl SpentTimeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Elapsed => "elapsed",
            Self::ReverseSeeded => "reverse_seeded",
        }
    }
}

impl fmt::Display for SpentTimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpentTimeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim();
        if normalized.eq_ignore_ascii_case("elapsed") {
            Ok(Self::Elapsed)
        } else if normalized.eq_ignore_ascii_case("reverse_seeded") {
            Ok(Self::ReverseSeeded)
        } else {
            Err(format!(
                "Invalid spent_mode value '{}'. Supported values: 'elapsed' or 'reverse_seeded'.",
                normalized
            ))
        }
    }
}

/// Reconstruct seconds spent per move, returned in play order.
///
/// Callers handle the empty case themselves; an empty slice simply yields
/// an empty vector.
pub fn reconstruct_time_spent(
    readings: &[u32],
    initial: u32,
    increment: u32,
    mode: SpentTimeMode,
) -> Vec<i64> {
    let inc = i64::from(increment);
    let mut spent = Vec::with_capacity(readings.len());

    match mode {
        SpentTimeMode::Elapsed => {
            // Walk backwards; the clock before move k is reading k-1, and the
            // walk bottoms out at the initial allotment.
            for (k, &reading) in readings.iter().enumerate().rev() {
                let previous_clock = match k {
                    0 => initial,
                    _ => readings[k - 1],
                };
                spent.push(i64::from(previous_clock) + inc - i64::from(reading));
            }
        }
        SpentTimeMode::ReverseSeeded => {
            let mut previous_clock = initial;
            for &reading in readings.iter().rev() {
                spent.push(i64::from(previous_clock) + inc - i64::from(reading));
                previous_clock = reading;
            }
        }
    }

    spent.reverse();
    spent
}
