//! Producer timestamp handling.
//!
//! Producers serialize timestamps either as RFC 3339 strings or in the
//! legacy `YYYYMMDD HH:MM:SS.mmm` form. Both are accepted on read;
//! RFC 3339 with millisecond precision is always written.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{Error, Result};

const LEGACY_FORMAT: &str = "%Y%m%d %H:%M:%S%.3f";

/// Parse a producer timestamp string. Legacy timestamps carry no zone and
/// are taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, LEGACY_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| Error::Timestamp(value.to_string()))
}

/// Serde adapter for required timestamp fields.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(de::Error::custom)
    }
}

/// Serde adapter for optional timestamp fields.
pub mod timestamp_opt {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|value| super::parse_timestamp(&value).map_err(de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_legacy_timestamp() {
        let parsed = parse_timestamp("20240514 12:30:45.123").unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 5, 14, 12, 30, 45).unwrap()
            + chrono::Duration::milliseconds(123);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_parse_rfc3339_timestamp() {
        let parsed = parse_timestamp("2024-05-14T12:30:45.123Z").unwrap();
        assert_eq!(parsed.timestamp_millis(), 1715689845123);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_timestamp("last tuesday").is_err());
    }
}
