use crate::format::TimeEncoding;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

/// strptime layout of `$time_local`, e.g. `10/Jan/2024:08:30:00 +0000`.
pub const TIME_LOCAL_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// strptime layout of the error log prefix, e.g. `2024/01/10 08:30:00`.
pub const ERROR_LOG_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

#[derive(Debug, Error)]
#[error("failed to parse timestamp '{value}' with format '{format}': {source}")]
pub struct TimestampError {
    value: String,
    format: String,
    #[source]
    source: chrono::ParseError,
}

/// Parse a `$time_local` value. The wall-clock part is combined with the
/// explicit signed offset in the value itself; the host time zone plays no role.
pub fn parse_time_local(value: &str) -> Result<DateTime<Utc>, TimestampError> {
    DateTime::parse_from_str(value, TIME_LOCAL_FORMAT)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| TimestampError {
            value: value.to_string(),
            format: TIME_LOCAL_FORMAT.to_string(),
            source,
        })
}

pub fn parse_iso8601(value: &str) -> Result<DateTime<Utc>, TimestampError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| TimestampError {
            value: value.to_string(),
            format: "iso8601".to_string(),
            source,
        })
}

/// Parse an error log timestamp. These carry no offset and are taken as UTC.
pub fn parse_error_time(value: &str) -> Result<DateTime<Utc>, TimestampError> {
    NaiveDateTime::parse_from_str(value, ERROR_LOG_FORMAT)
        .map(|ndt| Utc.from_utc_datetime(&ndt))
        .map_err(|source| TimestampError {
            value: value.to_string(),
            format: ERROR_LOG_FORMAT.to_string(),
            source,
        })
}

/// Normalize a captured access log timestamp, yielding `None` when it cannot
/// be parsed.
pub fn normalize(value: &str, encoding: TimeEncoding) -> Option<DateTime<Utc>> {
    let parsed = match encoding {
        TimeEncoding::Local => parse_time_local(value),
        TimeEncoding::Iso8601 => parse_iso8601(value),
    };

    match parsed {
        Ok(dt) => Some(dt),
        Err(e) => {
            tracing::trace!(error = %e, "Unparseable access log timestamp");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_local_utc() {
        let result = parse_time_local("10/Jan/2024:08:30:00 +0000").unwrap();
        assert_eq!(result.to_rfc3339(), "2024-01-10T08:30:00+00:00");
    }

    #[test]
    fn test_time_local_positive_offset_crosses_month() {
        let result = parse_time_local("01/Mar/2024:00:00:01 +0100").unwrap();
        assert_eq!(result.to_rfc3339(), "2024-02-29T23:00:01+00:00");
    }

    #[test]
    fn test_time_local_negative_offset() {
        let result = parse_time_local("31/Dec/2023:22:15:00 -0500").unwrap();
        assert_eq!(result.to_rfc3339(), "2024-01-01T03:15:00+00:00");
    }

    #[test]
    fn test_time_local_invalid() {
        assert!(parse_time_local("32/Foo/2024:99:00:00 +0000").is_err());
        assert!(normalize("not a date", TimeEncoding::Local).is_none());
    }

    #[test]
    fn test_iso8601_with_offset() {
        let result = parse_iso8601("2025-12-04T02:42:11+05:30").unwrap();
        assert_eq!(result.to_rfc3339(), "2025-12-03T21:12:11+00:00");
    }

    #[test]
    fn test_error_time_assumes_utc() {
        let result = parse_error_time("2024/01/10 08:30:00").unwrap();
        assert_eq!(result.to_rfc3339(), "2024-01-10T08:30:00+00:00");
    }
}
