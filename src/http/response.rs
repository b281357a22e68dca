//! Response payloads and the `Retry-After` wait hint.
//!
//! # Design Decisions
//! - The service always emits integer delta-seconds
//! - The parser also accepts fractional seconds and the clock form
//!   `[d.]hh:mm:ss[.fff]`; anything else means "no hint"

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Body of every `/api/service` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceReply {
    #[serde(default)]
    pub id: String,
}

/// Render a wait hint as delta-seconds, rounding partial seconds up.
pub fn format_retry_after(delay: Duration) -> String {
    let secs = delay.as_secs() + u64::from(delay.subsec_nanos() > 0);
    secs.to_string()
}

/// Parse a `Retry-After` header value into a wait duration.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    if value.contains(':') {
        return parse_clock(value);
    }
    parse_seconds(value)
}

fn parse_seconds(value: &str) -> Option<Duration> {
    if !value.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    let secs = value.parse::<f64>().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

fn parse_clock(value: &str) -> Option<Duration> {
    let mut parts = value.split(':');
    let (head, minutes, seconds) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let (days, hours) = match head.split_once('.') {
        Some((days, hours)) => (parse_digits(days)?, parse_digits(hours)?),
        None => (0, parse_digits(head)?),
    };
    let minutes = parse_digits(minutes)?;
    if hours >= 24 || minutes >= 60 {
        return None;
    }

    let seconds = parse_seconds(seconds)?;
    if seconds >= Duration::from_secs(60) {
        return None;
    }

    let whole = days
        .checked_mul(24)?
        .checked_add(hours)?
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?;
    Duration::from_secs(whole).checked_add(seconds)
}

fn parse_digits(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delta_seconds() {
        assert_eq!(parse_retry_after("5"), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(" 0 "), Some(Duration::ZERO));
        assert_eq!(parse_retry_after("1.5"), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_parse_clock_form() {
        assert_eq!(parse_retry_after("00:00:05"), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after("00:01:30"), Some(Duration::from_secs(90)));
        assert_eq!(parse_retry_after("1.02:00:00"), Some(Duration::from_secs(26 * 3600)));
        assert_eq!(
            parse_retry_after("00:00:02.250"),
            Some(Duration::from_millis(2250))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for value in [
            "",
            "soon",
            "-5",
            "inf",
            "NaN",
            "00:61:00",
            "25:00:00",
            "00:00:75",
            "00:05",
            "1:2:3:4",
            "Wed, 21 Oct 2015 07:28:00 GMT",
            "18446744073709551615.00:00:00",
            "213503982334601.23:59:59",
        ] {
            assert_eq!(parse_retry_after(value), None, "{:?}", value);
        }
    }

    #[test]
    fn test_format_rounds_up() {
        assert_eq!(format_retry_after(Duration::from_secs(5)), "5");
        assert_eq!(format_retry_after(Duration::from_millis(1200)), "2");
        assert_eq!(format_retry_after(Duration::ZERO), "0");
    }
}
