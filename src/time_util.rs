//! Time helpers. Grounded in `original_source/src/core/time_utils.py`.
//!
//! The one non-obvious rule here (preserved from the original): a naive
//! timestamp arriving from an external source is treated as *local* time,
//! not UTC, before being converted. This matters for any JSON payload that
//! didn't carry a timezone offset.

use chrono::{DateTime, Local, TimeZone, Utc};

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Normalize an optional naive-or-aware timestamp to aware UTC. A naive
/// value is interpreted as local time (matching the original's
/// `ensure_aware_utc`), not as UTC already.
pub fn ensure_aware_utc(naive_local: Option<chrono::NaiveDateTime>) -> Option<DateTime<Utc>> {
    naive_local.map(|ndt| match Local.from_local_datetime(&ndt) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
        chrono::LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        chrono::LocalResult::None => Utc.from_utc_datetime(&ndt),
    })
}

pub fn isoformat_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn parse_utc(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isoformat_has_trailing_z() {
        let dt = Utc::now();
        let s = isoformat_utc(dt);
        assert!(s.ends_with('Z'));
    }

    #[test]
    fn parse_roundtrip() {
        let dt = Utc::now();
        let s = isoformat_utc(dt);
        let parsed = parse_utc(&s).unwrap();
        assert_eq!(parsed.timestamp_millis(), dt.timestamp_millis());
    }
}
