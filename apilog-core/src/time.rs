//! Timestamp format and numeric presentation helpers shared by every crate.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Fixed wire format of log timestamps, implicitly UTC.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Hour-bucket key format (`HH:00`).
pub const HOUR_BUCKET_FORMAT: &str = "%H:00";

/// Parse a timestamp under [`TIMESTAMP_FORMAT`]. Returns `None` on any mismatch.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

pub fn hour_bucket(instant: &DateTime<Utc>) -> String {
    instant.format(HOUR_BUCKET_FORMAT).to_string()
}

/// Round half away from zero to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Two decimals: latencies, percentages, grand totals.
pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// Six decimals: per-endpoint and per-request money.
pub fn round6(value: f64) -> f64 {
    round_to(value, 6)
}

/// Serde adapter writing `DateTime<Utc>` under [`TIMESTAMP_FORMAT`].
pub mod log_format {
    use super::{TIMESTAMP_FORMAT, parse_timestamp};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(instant: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&instant.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_fixed_format() {
        let dt = parse_timestamp("2025-01-15T10:30:05Z").unwrap();
        assert_eq!(dt.year(), 2025);
        assert_eq!(dt.hour(), 10);
        assert_eq!(dt.second(), 5);
    }

    #[test]
    fn rejects_other_formats() {
        assert!(parse_timestamp("INVALID_TIME").is_none());
        assert!(parse_timestamp("2025-01-15 10:30:05").is_none());
        assert!(parse_timestamp("2025-01-15T10:30:05+00:00").is_none());
        assert!(parse_timestamp("2025-01-15T10:30:05.123Z").is_none());
        assert!(parse_timestamp("2025-02-30T10:30:05Z").is_none());
    }

    #[test]
    fn format_is_inverse_of_parse() {
        let raw = "2025-01-01T00:00:03Z";
        assert_eq!(format_timestamp(&parse_timestamp(raw).unwrap()), raw);
    }

    #[test]
    fn hour_bucket_uses_hour_only() {
        let dt = parse_timestamp("2025-01-01T07:59:59Z").unwrap();
        assert_eq!(hour_bucket(&dt), "07:00");
    }

    #[test]
    fn rounding_policy() {
        assert_eq!(round2(812.346), 812.35);
        assert_eq!(round2(33.333333), 33.33);
        assert_eq!(round6(0.00035), 0.00035);
        assert_eq!(round6(0.0000004), 0.0);
        assert_eq!(round2(0.0), 0.0);
    }
}
