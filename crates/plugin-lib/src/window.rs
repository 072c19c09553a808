//! Time window resolution for allocation queries
//!
//! A window reaches the backend either as an explicit RFC3339 range
//! (`"<start>,<end>"`) or as a backend shorthand such as `"30d"`.

use crate::error::{CostError, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Shorthand used whenever no usable window was supplied
pub const DEFAULT_WINDOW: &str = "30d";

const NANOS_PER_MICRO: i128 = 1_000;
const NANOS_PER_MILLI: i128 = 1_000_000;
const NANOS_PER_SECOND: i128 = 1_000_000_000;
const NANOS_PER_MINUTE: i128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i128 = 60 * NANOS_PER_MINUTE;

/// How a caller describes the period it wants costs for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowSpec {
    /// Explicit start/end timestamps, passed through as given
    Range { start: String, end: String },
    /// Relative token such as `"7d"` or `"1h30m"`, anchored at now
    Relative(String),
    /// Nothing supplied; use the default shorthand
    Unspecified,
}

impl WindowSpec {
    pub fn range(start: impl Into<String>, end: impl Into<String>) -> Self {
        WindowSpec::Range {
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn relative(token: impl Into<String>) -> Self {
        WindowSpec::Relative(token.into())
    }

    /// Range covering `[start, end]`, formatted as RFC3339
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        WindowSpec::Range {
            start: format_timestamp(start),
            end: format_timestamp(end),
        }
    }
}

/// Turns a [`WindowSpec`] into the string the backend expects
#[derive(Debug, Clone)]
pub struct WindowResolver {
    default_window: String,
}

impl Default for WindowResolver {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl WindowResolver {
    /// Create a resolver falling back to `default_window` (or `"30d"` if empty)
    pub fn new(default_window: impl Into<String>) -> Self {
        let default_window = default_window.into();
        let default_window = if default_window.trim().is_empty() {
            DEFAULT_WINDOW.to_string()
        } else {
            default_window
        };
        Self { default_window }
    }

    pub fn default_window(&self) -> &str {
        &self.default_window
    }

    /// Resolve against the current wall clock
    pub fn resolve(&self, spec: &WindowSpec) -> Result<String> {
        self.resolve_at(spec, Utc::now())
    }

    /// Resolve with an explicit "now"
    pub fn resolve_at(&self, spec: &WindowSpec, now: DateTime<Utc>) -> Result<String> {
        match spec {
            WindowSpec::Range { start, end } if !start.is_empty() && !end.is_empty() => {
                Ok(format!("{},{}", start, end))
            }
            WindowSpec::Range { .. } | WindowSpec::Unspecified => Ok(self.default_window.clone()),
            WindowSpec::Relative(token) => {
                let (start, end) = parse_duration_window_at(token, now)?;
                Ok(format_time_window(start, end))
            }
        }
    }
}

/// Format a range as `"<start>,<end>"` with second-precision RFC3339 stamps
pub fn format_time_window(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!("{},{}", format_timestamp(start), format_timestamp(end))
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a relative window token into `(now - duration, now)`
pub fn parse_duration_window(token: &str) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    parse_duration_window_at(token, Utc::now())
}

/// Same as [`parse_duration_window`] with an explicit "now"
///
/// `"<N>d"` is a whole number of days; anything else must follow the
/// duration grammar of [`parse_duration`]. Zero and negative values are
/// accepted, so the start may equal or follow `now`.
pub fn parse_duration_window_at(
    token: &str,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let invalid = || CostError::InvalidWindowFormat(token.to_string());

    let duration = if let Some(days) = token.strip_suffix('d') {
        let days: i64 = days.parse().map_err(|_| invalid())?;
        Duration::try_days(days).ok_or_else(invalid)?
    } else {
        parse_duration(token).ok_or_else(invalid)?
    };

    let start = now.checked_sub_signed(duration).ok_or_else(invalid)?;
    Ok((start, now))
}

/// Parse a duration such as `"300ms"`, `"-1.5h"` or `"2h45m"`
///
/// Accepts an optional sign followed by one or more decimal numbers, each
/// with a unit out of `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. A bare `"0"`
/// is also valid. Returns `None` on anything else or on overflow.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let (negative, mut rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    if rest == "0" {
        return Some(Duration::zero());
    }
    if rest.is_empty() {
        return None;
    }

    let mut total: i128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        rest = tail;

        let scale = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SECOND,
            "m" => NANOS_PER_MINUTE,
            "h" => NANOS_PER_HOUR,
            _ => return None,
        };

        total = total.checked_add(scaled_component(number, scale)?)?;
    }

    let nanos = i64::try_from(total).ok()?;
    Some(Duration::nanoseconds(if negative { -nanos } else { nanos }))
}

/// Value of one `<number><unit>` component in nanoseconds
fn scaled_component(number: &str, scale: i128) -> Option<i128> {
    let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && frac.is_empty() {
        return None;
    }

    let mut value = if whole.is_empty() {
        0
    } else {
        whole.parse::<i128>().ok()?.checked_mul(scale)?
    };

    if !frac.is_empty() {
        // Digits past nanosecond precision cannot change the result
        let frac = &frac[..frac.len().min(18)];
        let digits = frac.parse::<i128>().ok()?;
        let divisor = 10i128.pow(frac.len() as u32);
        value = value.checked_add(digits * scale / divisor)?;
    }

    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_explicit_range_is_passed_through() {
        let resolver = WindowResolver::default();
        let spec = WindowSpec::range("2024-01-01T00:00:00Z", "2024-01-31T23:59:59Z");
        assert_eq!(
            resolver.resolve(&spec).unwrap(),
            "2024-01-01T00:00:00Z,2024-01-31T23:59:59Z"
        );
    }

    #[test]
    fn test_range_with_empty_endpoint_falls_back_to_default() {
        let resolver = WindowResolver::default();
        assert_eq!(
            resolver
                .resolve(&WindowSpec::range("", "2024-01-31T23:59:59Z"))
                .unwrap(),
            "30d"
        );
        assert_eq!(
            resolver
                .resolve(&WindowSpec::range("2024-01-01T00:00:00Z", ""))
                .unwrap(),
            "30d"
        );
        assert_eq!(resolver.resolve(&WindowSpec::range("", "")).unwrap(), "30d");
    }

    #[test]
    fn test_unspecified_uses_configured_default() {
        let resolver = WindowResolver::new("7d");
        assert_eq!(resolver.resolve(&WindowSpec::Unspecified).unwrap(), "7d");

        let blank = WindowResolver::new("  ");
        assert_eq!(blank.default_window(), DEFAULT_WINDOW);
    }

    #[test]
    fn test_day_tokens_span_exact_days() {
        let now = fixed_now();
        for days in [1i64, 7, 30, 90, 365] {
            let (start, end) = parse_duration_window_at(&format!("{}d", days), now).unwrap();
            assert_eq!(end, now);
            assert_eq!(end - start, Duration::days(days));
        }
    }

    #[test]
    fn test_day_token_end_is_call_time() {
        let before = Utc::now();
        let (start, end) = parse_duration_window("30d").unwrap();
        let after = Utc::now();

        assert!(end >= before && end <= after);
        assert!((after - end) < Duration::seconds(1));
        assert_eq!(end - start, Duration::days(30));
    }

    #[test]
    fn test_relative_token_resolves_to_rfc3339_range() {
        let resolver = WindowResolver::default();
        let window = resolver
            .resolve_at(&WindowSpec::relative("2d"), fixed_now())
            .unwrap();
        assert_eq!(window, "2024-03-13T12:00:00Z,2024-03-15T12:00:00Z");
    }

    #[test]
    fn test_compound_duration() {
        let (start, end) = parse_duration_window_at("1h30m45s", fixed_now()).unwrap();
        assert_eq!(
            end - start,
            Duration::hours(1) + Duration::minutes(30) + Duration::seconds(45)
        );
    }

    #[test]
    fn test_zero_duration_starts_at_now() {
        let now = fixed_now();
        let (start, end) = parse_duration_window_at("0s", now).unwrap();
        assert_eq!(start, now);
        assert_eq!(end, now);

        let (start, _) = parse_duration_window_at("0d", now).unwrap();
        assert_eq!(start, now);
    }

    #[test]
    fn test_negative_duration_starts_after_now() {
        let now = fixed_now();
        let (start, end) = parse_duration_window_at("-1h", now).unwrap();
        assert_eq!(end, now);
        assert_eq!(start, now + Duration::hours(1));

        let (start, _) = parse_duration_window_at("-3d", now).unwrap();
        assert_eq!(start, now + Duration::days(3));
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        for token in ["abcd", "1.5d", "d", "", "30x", "1h30", "h", "--1h", "1..5s", "."] {
            match parse_duration_window_at(token, fixed_now()) {
                Err(CostError::InvalidWindowFormat(t)) => assert_eq!(t, token),
                other => panic!("expected InvalidWindowFormat for {:?}, got {:?}", token, other),
            }
        }
    }

    #[test]
    fn test_malformed_relative_spec_is_an_error() {
        let resolver = WindowResolver::default();
        assert!(matches!(
            resolver.resolve(&WindowSpec::relative("thirty days")),
            Err(CostError::InvalidWindowFormat(_))
        ));
    }

    #[test]
    fn test_parse_duration_grammar() {
        assert_eq!(parse_duration("300ms"), Some(Duration::milliseconds(300)));
        assert_eq!(parse_duration("1.5h"), Some(Duration::minutes(90)));
        assert_eq!(parse_duration(".5s"), Some(Duration::milliseconds(500)));
        assert_eq!(parse_duration("2us"), Some(Duration::microseconds(2)));
        assert_eq!(parse_duration("2µs"), Some(Duration::microseconds(2)));
        assert_eq!(parse_duration("+15s"), Some(Duration::seconds(15)));
        assert_eq!(parse_duration("0"), Some(Duration::zero()));
        assert_eq!(parse_duration("-0"), Some(Duration::zero()));
        assert_eq!(parse_duration("10"), None);
        assert_eq!(parse_duration("1d"), None);
    }

    #[test]
    fn test_huge_day_count_is_rejected_not_panicking() {
        assert!(parse_duration_window_at("9999999999999999d", fixed_now()).is_err());
        assert!(parse_duration("99999999999999999999h").is_none());
    }
}
