//! `yyyy-MM-dd HH:mm:ss` timestamps, interpreted as UTC.
//!
//! Used with `#[serde(with = "ewm_core::timestamp")]` on `DateTime<Utc>`
//! fields, or `timestamp::option` for optional ones.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// The wire format.
pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats a timestamp.
#[must_use]
pub fn format(value: &DateTime<Utc>) -> String {
    value.format(FORMAT).to_string()
}

/// Parses a timestamp.
///
/// # Errors
///
/// Returns the chrono parse error when `value` does not match [`FORMAT`].
pub fn parse(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, FORMAT).map(|naive| naive.and_utc())
}

/// Serde serializer.
///
/// # Errors
///
/// Propagates serializer errors.
pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(value))
}

/// Serde deserializer.
///
/// # Errors
///
/// Fails when the input is not a string in [`FORMAT`].
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}

/// Same format for `Option<DateTime<Utc>>`.
pub mod option {
    use super::{format, parse};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serde serializer.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_some(&format(value)),
            None => serializer.serialize_none(),
        }
    }

    /// Serde deserializer.
    ///
    /// # Errors
    ///
    /// Fails when a present value is not a string in the expected format.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| parse(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}
