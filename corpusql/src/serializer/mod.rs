//! Writing patterns as corpus query language text, and as JSON in both
//! directions.

use crate::errors::Result;
use crate::matchfilter::MatchFilter;
use crate::textpattern::TextPattern;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

mod cql;
mod json;

pub use cql::{filter_to_cql, to_cql};
pub use json::{filter_from_json, filter_to_json, from_json, to_json};

/// Write a pattern as a JSON string.
pub fn to_json_string(pattern: &TextPattern) -> Result<String> {
    Ok(serde_json::to_string(&to_json(pattern))?)
}

/// Parse a pattern from a JSON string.
pub fn from_json_str(json: &str) -> Result<TextPattern> {
    let value: Value = serde_json::from_str(json)?;
    from_json(&value)
}

impl Serialize for TextPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        to_json(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TextPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        from_json(&value).map_err(serde::de::Error::custom)
    }
}

impl Serialize for MatchFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        filter_to_json(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MatchFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        filter_from_json(&value).map_err(serde::de::Error::custom)
    }
}
