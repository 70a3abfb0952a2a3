//! Document identifiers and timestamps.
//!
//! Identifiers are 24 lowercase hex characters: a 4-byte big-endian unix
//! timestamp followed by 8 random bytes. They sort roughly by creation time
//! and share the shape that `objectId` filter fields accept.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::{Rng, rng};

/// Generate a new 24-hex-character document identifier.
pub fn object_id() -> String {
    let secs = Utc::now().timestamp() as u32;
    let tail: [u8; 8] = rng().random();
    let mut id = format!("{secs:08x}");
    for byte in tail {
        id.push_str(&format!("{byte:02x}"));
    }
    id
}

/// True if `value` has the 24-hex-character identifier shape.
pub fn is_object_id(value: &str) -> bool {
    value.len() == 24 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Render a timestamp in the fixed-width form stored in documents.
///
/// Fixed millisecond precision keeps lexicographic and chronological order
/// identical, which the stores rely on when sorting by `createdAt`.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serde adapter for `DateTime<Utc>` fields stored via [`timestamp`].
pub mod fixed_time {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::timestamp(*at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            at: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match at {
                Some(at) => s.serialize_str(&super::super::timestamp(*at)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw = Option::<String>::deserialize(d)?;
            raw.map(|r| {
                DateTime::parse_from_rfc3339(&r)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
        }
    }
}
