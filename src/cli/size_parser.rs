//! Size and duration parsing
//!
//! Disk quotas are written as human sizes ("5GB", "512M", "0.5T") and
//! intervals as a number with a unit suffix ("30s", "10m", "2h").

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SizeParseError {
    #[error("Invalid size format: {input}. Expected format like '512MB', '5GB', '2048K'")]
    InvalidFormat { input: String },

    #[error("Invalid size unit: {unit}. Supported units: B, K, M, G, T (with optional 'B' suffix)")]
    InvalidUnit { unit: String },

    #[error("Invalid duration: {input}. Expected format like '30s', '10m', '2h'")]
    InvalidDuration { input: String },
}

/// Parse a size string into bytes using binary multiples
///
/// ```
/// use plugin_verifier::cli::size_parser::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1K").unwrap(), 1024);
/// assert_eq!(parse_size("5GB").unwrap(), 5 * 1024 * 1024 * 1024);
/// assert_eq!(parse_size("0.5G").unwrap(), 512 * 1024 * 1024);
/// ```
pub fn parse_size(input: &str) -> Result<u64, SizeParseError> {
    let input = input.trim().to_uppercase();
    let (number, unit) = split_number(&input).ok_or_else(|| SizeParseError::InvalidFormat { input: input.clone() })?;

    let value: f64 = number
        .parse()
        .map_err(|_| SizeParseError::InvalidFormat { input: input.clone() })?;
    let multiplier: u64 = match unit.trim() {
        "" | "B" | "BYTES" => 1,
        "K" | "KB" | "KIB" => 1024,
        "M" | "MB" | "MIB" => 1024 * 1024,
        "G" | "GB" | "GIB" => 1024 * 1024 * 1024,
        "T" | "TB" | "TIB" => 1024_u64.pow(4),
        other => return Err(SizeParseError::InvalidUnit { unit: other.to_string() }),
    };
    Ok((value * multiplier as f64) as u64)
}

/// Parse an interval such as `90s`, `15m` or `1h`; a bare number is seconds
pub fn parse_duration(input: &str) -> Result<Duration, SizeParseError> {
    let trimmed = input.trim().to_lowercase();
    let invalid = || SizeParseError::InvalidDuration {
        input: input.to_string(),
    };
    let (number, unit) = split_number(&trimmed).ok_or_else(invalid)?;
    let value: f64 = number.parse().map_err(|_| invalid())?;
    let seconds = match unit.trim() {
        "" | "s" | "sec" | "secs" => value,
        "m" | "min" | "mins" => value * 60.0,
        "h" | "hour" | "hours" => value * 3600.0,
        _ => return Err(invalid()),
    };
    Ok(Duration::from_secs_f64(seconds))
}

/// Split a leading non-negative decimal from its unit suffix
fn split_number(input: &str) -> Option<(&str, &str)> {
    let mut number_end = 0;
    let mut found_decimal = false;
    for (i, ch) in input.char_indices() {
        match ch {
            '0'..='9' => number_end = i + 1,
            '.' if !found_decimal => {
                found_decimal = true;
                number_end = i + 1;
            }
            _ => break,
        }
    }
    if number_end == 0 {
        None
    } else {
        Some((&input[..number_end], &input[number_end..]))
    }
}
