use std::error::Error;
use std::sync::LazyLock;

use duckdb::{
    Result,
    core::{DataChunkHandle, LogicalTypeHandle, LogicalTypeId},
    vscalar::{ScalarFunctionSignature, VScalar},
    vtab::arrow::WritableVector,
};
use regex::Regex;

use crate::duckdb_impl::scalar::invoke_unary_varchar_to_u64_nullable;
use crate::error::FeatureError;

static CLOCK_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[%clk ([0-9]+:[0-9]+:[0-9]+|[0-9]+:[0-9]+)\]")
        .expect("clock marker pattern is valid")
});

/// Find the first `[%clk H:MM:SS]` / `[%clk M:SS]` marker in a move comment
/// and return its time token. Components are not range-checked.
pub fn extract_clock_token(comment: &str) -> Option<&str> {
    CLOCK_MARKER
        .captures(comment)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Convert a clock token to seconds.
///
/// Tokens with a component count other than 2 or 3 yield `0` without looking
/// at the components. A non-numeric component is an error.
pub fn clock_token_to_seconds(token: &str) -> Result<u32, FeatureError> {
    let parts: Vec<&str> = token.split(':').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return Ok(0);
    }

    let malformed = || FeatureError::MalformedClockToken {
        token: token.to_string(),
    };

    let mut total: u32 = 0;
    for part in &parts {
        let value: u32 = part.parse().map_err(|_| malformed())?;
        total = total
            .checked_mul(60)
            .and_then(|t| t.checked_add(value))
            .ok_or_else(malformed)?;
    }

    Ok(total)
}

/// Remaining clock recorded in a move comment, if any.
pub fn parse_clock_comment(comment: &str) -> Result<Option<u32>, FeatureError> {
    extract_clock_token(comment)
        .map(clock_token_to_seconds)
        .transpose()
}

pub struct ChessClockSecondsScalar;

impl VScalar for ChessClockSecondsScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_unary_varchar_to_u64_nullable(input, output, |comment| {
            parse_clock_comment(comment).ok().flatten().map(u64::from)
        })
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        vec![ScalarFunctionSignature::exact(
            vec![LogicalTypeHandle::from(LogicalTypeId::Varchar)],
            LogicalTypeHandle::from(LogicalTypeId::UBigint),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_hms_token() {
        assert_eq!(extract_clock_token("[%clk 1:30:43]"), Some("1:30:43"));
    }

    #[test]
    fn test_extract_ms_token() {
        assert_eq!(extract_clock_token("[%clk 5:09]"), Some("5:09"));
    }

    #[test]
    fn test_extract_among_other_annotations() {
        let comment = "[%eval 0.25] [%clk 0:02:58] good move";
        assert_eq!(extract_clock_token(comment), Some("0:02:58"));
    }

    #[test]
    fn test_extract_absent() {
        assert_eq!(extract_clock_token(""), None);
        assert_eq!(extract_clock_token("best by test"), None);
        assert_eq!(extract_clock_token("[%eval 0.25]"), None);
        assert_eq!(extract_clock_token("[%clk ]"), None);
    }

    #[test]
    fn test_extract_ignores_non_ascii_digits() {
        assert_eq!(extract_clock_token("[%clk ١:٠٠]"), None);
        assert_eq!(parse_clock_comment("[%clk ١:٠٠]").unwrap(), None);
    }

    #[test]
    fn test_extract_first_marker_wins() {
        assert_eq!(
            extract_clock_token("[%clk 0:01:00] [%clk 0:00:30]"),
            Some("0:01:00")
        );
    }

    #[test]
    fn test_extract_does_not_range_check() {
        assert_eq!(extract_clock_token("[%clk 99:99:99]"), Some("99:99:99"));
    }

    #[test]
    fn test_seconds_from_hms() {
        assert_eq!(clock_token_to_seconds("1:02:03").unwrap(), 3723);
        assert_eq!(clock_token_to_seconds("0:00:00").unwrap(), 0);
    }

    #[test]
    fn test_seconds_from_ms() {
        assert_eq!(clock_token_to_seconds("5:09").unwrap(), 309);
    }

    #[test]
    fn test_seconds_unexpected_component_count_is_zero() {
        assert_eq!(clock_token_to_seconds("garbage:1:2:3").unwrap(), 0);
        assert_eq!(clock_token_to_seconds("42").unwrap(), 0);
    }

    #[test]
    fn test_seconds_non_numeric_component_is_error() {
        let err = clock_token_to_seconds("1:xx:03").unwrap_err();
        assert!(matches!(err, FeatureError::MalformedClockToken { ref token } if token == "1:xx:03"));
    }

    #[test]
    fn test_seconds_out_of_range_components_accepted() {
        assert_eq!(
            clock_token_to_seconds("99:99:99").unwrap(),
            99 * 3600 + 99 * 60 + 99
        );
    }

    #[test]
    fn test_seconds_overflow_is_error() {
        assert!(clock_token_to_seconds("99999999:00:00").is_err());
    }

    #[test]
    fn test_parse_clock_comment() {
        assert_eq!(
            parse_clock_comment("[%eval 0.22] [%clk 1:30:42]").unwrap(),
            Some(5442)
        );
        assert_eq!(parse_clock_comment("no clock here").unwrap(), None);
    }
}
