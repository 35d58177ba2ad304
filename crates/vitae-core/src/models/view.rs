//! View event model

use chrono::{DateTime, Datelike, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A single reported view of a share link
///
/// Only `timestamp` is interpreted; every other field the client sends is kept
/// verbatim in `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewEvent {
    /// When the view happened
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Opaque client telemetry (referrer, device info, ...)
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl ViewEvent {
    /// Create an event with no extra attributes
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            attributes: Map::new(),
        }
    }

    /// Attach an attribute
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Fail unless the timestamp has a four-digit year (0000 to 9999).
    ///
    /// Stored timestamps are RFC 3339 text, which has no room for wider years.
    pub fn ensure_storable(&self) -> Result<()> {
        if in_storable_range(self.timestamp) {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "View timestamp {} is outside years 0000-9999",
                self.timestamp
            )))
        }
    }

    /// Build an event from a client-supplied JSON payload.
    ///
    /// The payload must be an object with a `timestamp` given either as an
    /// RFC 3339 string or as Unix epoch milliseconds, falling in years
    /// 0000 to 9999 once normalized to UTC.
    pub fn from_payload(payload: Value) -> Result<Self> {
        if !payload.is_object() {
            return Err(Error::InvalidInput(
                "View payload must be a JSON object".into(),
            ));
        }
        serde_json::from_value(payload)
            .map_err(|error| Error::InvalidInput(format!("Invalid view payload: {error}")))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireTimestamp {
    Millis(i64),
    Text(String),
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let timestamp = match WireTimestamp::deserialize(deserializer)? {
        WireTimestamp::Millis(millis) => DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| de::Error::custom("timestamp out of range"))?,
        WireTimestamp::Text(text) => DateTime::parse_from_rfc3339(text.trim())
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(de::Error::custom)?,
    };
    if !in_storable_range(timestamp) {
        return Err(de::Error::custom("timestamp outside years 0000-9999"));
    }
    Ok(timestamp)
}

fn in_storable_range(timestamp: DateTime<Utc>) -> bool {
    (0..=9999).contains(&timestamp.year())
}
