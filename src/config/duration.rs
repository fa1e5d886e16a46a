//! Duration String Parsing
//!
//! Parses TTL strings such as `"10m"`, `"1h30m"` or `"1s 500ms"` into
//! `std::time::Duration`.

use std::time::Duration;

use thiserror::Error;

/// Error type for duration parsing
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DurationParseError {
    #[error("Invalid duration format: {0}")]
    InvalidFormat(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    #[error("Empty duration string")]
    EmptyString,
}

// == Parse Duration ==
/// Parses a duration made of `<number><unit>` groups.
///
/// Supported units are `ms`, `s`, `m`, `h` and `d`. Groups may be written
/// back to back (`"1h30m"`) or separated by whitespace (`"1h 30m"`), and
/// numbers may be fractional (`"1.5s"`).
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use polycache::config::parse_duration;
///
/// assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
/// assert_eq!(parse_duration("1s 500ms").unwrap(), Duration::from_millis(1500));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, DurationParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(DurationParseError::EmptyString);
    }

    let mut total = Duration::ZERO;
    let mut current_number = String::new();
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch.is_ascii_digit() || ch == '.' {
            current_number.push(ch);
            continue;
        }
        if ch.is_whitespace() {
            if !current_number.is_empty() {
                return Err(DurationParseError::InvalidFormat(
                    "Missing unit after number".to_string(),
                ));
            }
            continue;
        }

        // "ms" is the only two-character unit
        let unit = if ch == 'm' && chars.peek() == Some(&'s') {
            chars.next();
            "ms".to_string()
        } else {
            ch.to_string()
        };

        if current_number.is_empty() {
            return Err(DurationParseError::InvalidFormat(
                "Expected number before unit".to_string(),
            ));
        }

        let value: f64 = current_number
            .parse()
            .map_err(|_| DurationParseError::InvalidNumber(current_number.clone()))?;

        let seconds = match unit.as_str() {
            "ms" => value / 1000.0,
            "s" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            "d" => value * 86400.0,
            _ => return Err(DurationParseError::UnknownUnit(unit)),
        };

        let part = Duration::try_from_secs_f64(seconds)
            .map_err(|_| DurationParseError::InvalidNumber(current_number.clone()))?;
        total = total
            .checked_add(part)
            .ok_or_else(|| DurationParseError::InvalidNumber(current_number.clone()))?;
        current_number.clear();
    }

    if !current_number.is_empty() {
        return Err(DurationParseError::InvalidFormat(
            "Missing unit after number".to_string(),
        ));
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_units() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
    }

    #[test]
    fn test_parse_zero() {
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_compound_without_spaces() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(
            parse_duration("1s500ms").unwrap(),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn test_parse_compound_with_spaces() {
        assert_eq!(parse_duration("  1h 30m ").unwrap(), Duration::from_secs(5400));
        assert_eq!(
            parse_duration("2h 15m 30s").unwrap(),
            Duration::from_secs(8130)
        );
    }

    #[test]
    fn test_parse_fractional() {
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("0.5m").unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_duration(""), Err(DurationParseError::EmptyString));
        assert_eq!(parse_duration("   "), Err(DurationParseError::EmptyString));
        assert!(matches!(
            parse_duration("10"),
            Err(DurationParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_duration("10 m"),
            Err(DurationParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_duration("m"),
            Err(DurationParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_duration("5x"),
            Err(DurationParseError::UnknownUnit(_))
        ));
        assert!(matches!(
            parse_duration("1.2.3s"),
            Err(DurationParseError::InvalidNumber(_))
        ));
        // Each group fits in a Duration, their sum does not
        assert!(matches!(
            parse_duration("10000000000000000000s 10000000000000000000s"),
            Err(DurationParseError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_parse_negative_is_rejected() {
        assert!(parse_duration("-5s").is_err());
    }
}
