//! Time utilities for wire and domain timestamps.

use chrono::{DateTime, Utc};

/// Current wall-clock time in UTC.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Parse an RFC 3339 timestamp into UTC.
///
/// Returns `None` when the input is not a valid RFC 3339 timestamp.
pub fn utc_from_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utc_from_rfc3339_valid() {
        // given: an RFC 3339 timestamp with an offset
        let value = "2026-08-29T12:34:56+09:00";

        // when:
        let parsed = utc_from_rfc3339(value);

        // then: parsed and normalized to UTC
        let dt = parsed.expect("should parse");
        assert_eq!(dt.to_rfc3339(), "2026-08-29T03:34:56+00:00");
    }

    #[test]
    fn test_utc_from_rfc3339_invalid() {
        // given: garbage input
        let value = "not-a-timestamp";

        // when:
        let parsed = utc_from_rfc3339(value);

        // then:
        assert!(parsed.is_none());
    }

    #[test]
    fn test_now_utc_is_monotonic_enough() {
        // given/when: two consecutive readings
        let a = now_utc();
        let b = now_utc();

        // then: the clock never runs backwards between calls
        assert!(b >= a);
    }
}
