// src/ingest/timestamp.rs
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::parse::ParseError;

/// Naive formats seen in the wild: ISO date-times without an offset, and the
/// space-separated variant some JSON endpoints emit.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse an assorted feed timestamp into a timezone-aware instant. Inputs
/// with no timezone of their own are treated as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ParseError> {
    parse_timestamp_with_default(raw, None)
}

/// Parse an assorted feed timestamp into a timezone-aware instant.
///
/// Accepts RFC 822/2822 (RSS `pubDate`), RFC 3339/ISO 8601 (Atom
/// `published`/`updated`), naive date-times and bare dates. `default_offset`
/// applies only to inputs that carry no timezone of their own; `None` means
/// UTC. Anything else is a `ParseError`; callers must reject such items
/// rather than defaulting to "now" or epoch, which would silently file them
/// under the wrong day.
pub fn parse_timestamp_with_default(
    raw: &str,
    default_offset: Option<FixedOffset>,
) -> Result<DateTime<Utc>, ParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ParseError::Timestamp(raw.to_string()));
    }

    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc2822) {
        if let Some(dt) = DateTime::from_timestamp(dt.unix_timestamp(), 0) {
            return Ok(dt);
        }
    }
    // chrono accepts the obsolete zone names (GMT, UT, EST, ...) still common
    // in RSS pubDate fields
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        // second precision is enough; digests compare at day granularity
        if let Some(dt) = DateTime::from_timestamp(dt.unix_timestamp(), 0) {
            return Ok(dt);
        }
    }
    // ISO 8601 with a numeric offset but no colon ("+0800") is not valid RFC 3339
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(resolve_naive(naive, default_offset));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(resolve_naive(naive, default_offset));
        }
    }

    Err(ParseError::Timestamp(raw.to_string()))
}

fn resolve_naive(naive: NaiveDateTime, default_offset: Option<FixedOffset>) -> DateTime<Utc> {
    match default_offset.and_then(|offset| offset.from_local_datetime(&naive).single()) {
        Some(dt) => dt.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&naive),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn rfc2822_with_numeric_offset() {
        let dt = parse_timestamp("Tue, 04 Mar 2025 09:30:00 +0100").unwrap();
        assert_eq!(dt, utc(2025, 3, 4, 8, 30, 0));
    }

    #[test]
    fn rfc2822_with_gmt_zone_name() {
        let dt = parse_timestamp("Tue, 04 Mar 2025 09:30:00 GMT").unwrap();
        assert_eq!(dt, utc(2025, 3, 4, 9, 30, 0));
    }

    #[test]
    fn rfc3339_with_offset_and_fraction() {
        let dt = parse_timestamp("2025-03-04T09:30:00+08:00").unwrap();
        assert_eq!(dt, utc(2025, 3, 4, 1, 30, 0));
        let dt = parse_timestamp("2025-03-04T09:30:00.250Z").unwrap();
        assert_eq!(dt, utc(2025, 3, 4, 9, 30, 0));
    }

    #[test]
    fn iso_offset_without_colon() {
        let dt = parse_timestamp("2025-03-04T09:30:00+0800").unwrap();
        assert_eq!(dt, utc(2025, 3, 4, 1, 30, 0));
    }

    #[test]
    fn naive_datetime_is_treated_as_utc() {
        let dt = parse_timestamp("2025-03-04T09:30:00").unwrap();
        assert_eq!(dt, utc(2025, 3, 4, 9, 30, 0));
        let dt = parse_timestamp("2025-03-04 09:30:00").unwrap();
        assert_eq!(dt, utc(2025, 3, 4, 9, 30, 0));
    }

    #[test]
    fn bare_date_becomes_utc_midnight() {
        let dt = parse_timestamp("2025-03-04").unwrap();
        assert_eq!(dt, utc(2025, 3, 4, 0, 0, 0));
    }

    #[test]
    fn source_offset_applies_to_naive_inputs_only() {
        let offset = FixedOffset::east_opt(8 * 3600).unwrap();
        let dt = parse_timestamp_with_default("2025-03-04T08:00:00", Some(offset)).unwrap();
        assert_eq!(dt, utc(2025, 3, 4, 0, 0, 0));
        // an explicit timezone in the input wins over the default
        let dt = parse_timestamp_with_default("2025-03-04T08:00:00Z", Some(offset)).unwrap();
        assert_eq!(dt, utc(2025, 3, 4, 8, 0, 0));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("04/03/2025").is_err());
        assert!(matches!(
            parse_timestamp("not a date"),
            Err(ParseError::Timestamp(_))
        ));
    }
}
