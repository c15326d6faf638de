use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};

/// Formats the platform uses for timestamps that carry no offset; read as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Point in time as reported by the API.
///
/// Completions report `created` as Unix seconds, the metrics endpoint reports
/// `measured_at` as a date-time string, with or without an offset. Both
/// deserialize into this type; it serializes back as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Timestamp(DateTime<Utc>);

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TimestampVisitor;

        impl de::Visitor<'_> for TimestampVisitor {
            type Value = Timestamp;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a UNIX timestamp or a date-time string")
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Timestamp::from_unix_timestamp(value)
                    .ok_or_else(|| E::custom(format!("timestamp {value} is out of range")))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let secs = i64::try_from(value)
                    .map_err(|_| E::custom(format!("timestamp {value} is out of range")))?;
                self.visit_i64(secs)
            }

            #[allow(clippy::cast_possible_truncation)]
            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if !value.is_finite() {
                    return Err(E::custom("floating point timestamp is not finite"));
                }
                self.visit_i64(value.trunc() as i64)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Timestamp::parse(value)
                    .ok_or_else(|| E::custom(format!("invalid date-time string: {value}")))
            }
        }

        deserializer.deserialize_any(TimestampVisitor)
    }
}

impl Timestamp {
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Seconds since the Unix epoch; `None` when out of chrono's range.
    #[must_use]
    pub fn from_unix_timestamp(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0).single().map(Self)
    }

    /// Parse RFC 3339 or one of the offset-less formats the platform emits.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Self(dt.with_timezone(&Utc)));
        }

        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(|naive| Self(naive.and_utc()))
    }

    #[must_use]
    pub fn to_unix_timestamp_i64(&self) -> i64 {
        self.0.timestamp()
    }

    #[must_use]
    pub fn to_iso_string(&self) -> String {
        self.0.to_rfc3339()
    }

    #[must_use]
    pub fn inner(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::Timestamp;

    #[test]
    fn deserializes_from_integer_seconds() {
        let ts: Timestamp = serde_json::from_str("1758887156").expect("integer timestamps should parse");
        assert_eq!(ts.to_unix_timestamp_i64(), 1_758_887_156);
    }

    #[test]
    fn deserializes_from_rfc3339_string() {
        let json = "\"2025-09-26T11:45:56Z\"";
        let ts: Timestamp = serde_json::from_str(json).expect("RFC3339 string should parse");
        assert_eq!(ts.to_unix_timestamp_i64(), 1_758_887_156);
    }

    #[test]
    fn deserializes_from_naive_metrics_string() {
        let json = "\"2025-09-26 11:45:56.250\"";
        let ts: Timestamp = serde_json::from_str(json).expect("naive date-time should parse as UTC");
        assert_eq!(ts.to_unix_timestamp_i64(), 1_758_887_156);
    }

    #[test]
    fn serialized_form_parses_back() {
        let ts: Timestamp = serde_json::from_str("1758887156").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<Timestamp>("\"yesterday\"").is_err());
    }
}
