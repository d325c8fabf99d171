//! Clock notation codec.
//!
//! Converts between `H:MM:SS.cc` style strings and seconds. Parsing accepts any
//! number of colon-separated components (`90`, `1:30`, `0:01:30.5`), formatting
//! always produces the ASS form with centisecond precision.

use thiserror::Error;

/// Error for an unparseable clock value.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid timestamp: '{0}'")]
pub struct TimestampError(pub String);

/// Parse a clock value into seconds.
///
/// Each component is folded as `sum * 60 + component`, so a bare number is
/// seconds and `1:00:00` is one hour.
pub fn parse_timestamp(value: &str) -> Result<f64, TimestampError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TimestampError(value.to_string()));
    }

    value.split(':').try_fold(0.0, |sum, component| {
        let component = component.trim();
        let parsed: f64 = component
            .parse()
            .map_err(|_| TimestampError(value.to_string()))?;
        if !parsed.is_finite() {
            return Err(TimestampError(value.to_string()));
        }
        Ok(sum * 60.0 + parsed)
    })
}

/// Format seconds as `H:MM:SS.cc`.
///
/// Negative values clamp to zero and the fractional part is truncated to
/// centiseconds.
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    // Round to the millisecond first so 1.23 does not become 1.22 through float error.
    let total_ms = (seconds * 1000.0).round() as u64;
    let total_cs = total_ms / 10;

    let cs = total_cs % 100;
    let total_secs = total_cs / 100;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;

    format!("{}:{:02}:{:02}.{:02}", hours, mins, secs, cs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clock_components() {
        assert!((parse_timestamp("0:00:01.50").unwrap() - 1.5).abs() < 1e-9);
        assert!((parse_timestamp("1:02:03.5").unwrap() - 3723.5).abs() < 1e-9);
        assert!((parse_timestamp("1:30").unwrap() - 90.0).abs() < 1e-9);
        assert!((parse_timestamp("42.25").unwrap() - 42.25).abs() < 1e-9);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("1:xx:00").is_err());
        assert!(parse_timestamp("1::00").is_err());
    }

    #[test]
    fn formats_ass_clock() {
        assert_eq!(format_timestamp(0.0), "0:00:00.00");
        assert_eq!(format_timestamp(1.5), "0:00:01.50");
        assert_eq!(format_timestamp(3723.456), "1:02:03.45");
        assert_eq!(format_timestamp(1.23), "0:00:01.23");
    }

    #[test]
    fn format_clamps_negative() {
        assert_eq!(format_timestamp(-4.0), "0:00:00.00");
    }

    #[test]
    fn format_does_not_wrap_days() {
        assert_eq!(format_timestamp(90000.0), "25:00:00.00");
    }

    #[test]
    fn parse_reads_formatted_values() {
        let formatted = format_timestamp(754.32);
        assert!((parse_timestamp(&formatted).unwrap() - 754.32).abs() < 0.01);
    }
}
