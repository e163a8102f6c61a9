//! Duration and size literal parsers
//!
//! Literals have the form `<non-negative integer><unit>`:
//! - durations: `s`, `m`, `h`, `d`, `w` (converted to milliseconds)
//! - sizes: `b`, `kb`, `mb`, `gb` (validated only, passed through unchanged)
//!
//! Units are lower-case and no whitespace is allowed.

use crate::error::{Error, Result};

const MILLIS_PER_SECOND: i64 = 1_000;
const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;
const MILLIS_PER_WEEK: i64 = 7 * MILLIS_PER_DAY;

/// Size units accepted by [`parse_size`]
pub const SIZE_UNITS: [&str; 4] = ["b", "kb", "mb", "gb"];

/// Split a literal into its magnitude and unit suffix.
fn split_literal(literal: &str) -> Result<(u64, &str)> {
    if literal.starts_with('-') {
        return Err(Error::invalid_literal(literal, "negative magnitude"));
    }
    let split = literal
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(literal.len());
    let (digits, unit) = literal.split_at(split);
    if digits.is_empty() {
        return Err(Error::invalid_literal(literal, "missing numeric prefix"));
    }
    if unit.is_empty() {
        return Err(Error::invalid_literal(literal, "missing unit suffix"));
    }
    let magnitude = digits
        .parse::<u64>()
        .map_err(|e| Error::invalid_literal(literal, format!("bad magnitude: {}", e)))?;
    Ok((magnitude, unit))
}

/// Parse a duration literal into milliseconds.
///
/// ```
/// use strata_fixture_core::parse_duration;
///
/// assert_eq!(parse_duration("2d").unwrap(), 172_800_000);
/// assert_eq!(parse_duration("1h").unwrap(), 3_600_000);
/// assert!(parse_duration("2y").is_err());
/// ```
pub fn parse_duration(literal: &str) -> Result<i64> {
    let (magnitude, unit) = split_literal(literal)?;
    let per_unit = match unit {
        "s" => MILLIS_PER_SECOND,
        "m" => MILLIS_PER_MINUTE,
        "h" => MILLIS_PER_HOUR,
        "d" => MILLIS_PER_DAY,
        "w" => MILLIS_PER_WEEK,
        other => {
            return Err(Error::invalid_literal(
                literal,
                format!("unknown duration unit '{}' (expected s, m, h, d or w)", other),
            ))
        }
    };
    i64::try_from(magnitude)
        .ok()
        .and_then(|m| m.checked_mul(per_unit))
        .ok_or_else(|| Error::invalid_literal(literal, "duration overflows 64-bit milliseconds"))
}

/// Validate a size literal and return it unchanged.
///
/// The store interprets the unit itself; no conversion to bytes happens here.
///
/// ```
/// use strata_fixture_core::parse_size;
///
/// assert_eq!(parse_size("10kb").unwrap(), "10kb");
/// assert!(parse_size("10tb").is_err());
/// ```
pub fn parse_size(literal: &str) -> Result<String> {
    let (_, unit) = split_literal(literal)?;
    if !SIZE_UNITS.contains(&unit) {
        return Err(Error::invalid_literal(
            literal,
            format!("unknown size unit '{}' (expected b, kb, mb or gb)", unit),
        ));
    }
    Ok(literal.to_string())
}
