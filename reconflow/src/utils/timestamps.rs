//! Timestamp helpers for event payloads.

use chrono::{DateTime, Utc};

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC time as an ISO 8601 string with microsecond
/// precision and an explicit `+00:00` offset.
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_timestamp_format() {
        let ts = iso_timestamp();
        assert!(ts.contains('T'));
        assert!(ts.ends_with("+00:00"));

        // Microsecond precision: 6 fractional digits before the offset.
        let fraction = ts.split('.').nth(1).unwrap();
        assert_eq!(fraction.trim_end_matches("+00:00").len(), 6);
    }

    #[test]
    fn test_iso_timestamp_parses_back() {
        let ts = iso_timestamp();
        let parsed: Timestamp = ts.parse().unwrap();
        assert!(parsed <= Utc::now());
    }
}
