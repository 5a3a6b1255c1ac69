use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::SchemaError;

/// Type tag assignable to an attribute in a type map.
///
/// Scalar tags coerce raw values in place. `Collection` and `Model` route the
/// raw value to a nested instance instead of storing it in the flat
/// container. `Ignore` passes the value through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrType {
    Number,
    String,
    Boolean,
    /// Calendar date; coerces to a UTC timestamp at midnight.
    Date,
    /// Full timestamp.
    DateTime,
    /// Stored identically to `DateTime`; kept distinct so schemas round-trip.
    Time,
    Collection,
    Array,
    Model,
    Ignore,
}

impl AttrType {
    /// Returns the tag exactly as it appears in serialized type maps.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttrType::Number => "number",
            AttrType::String => "string",
            AttrType::Boolean => "boolean",
            AttrType::Date => "date",
            AttrType::DateTime => "datetime",
            AttrType::Time => "time",
            AttrType::Collection => "collection",
            AttrType::Array => "array",
            AttrType::Model => "model",
            AttrType::Ignore => "ignore",
        }
    }

    /// True for tags whose values live in a nested instance rather than the
    /// flat attribute container.
    pub fn is_nested(&self) -> bool {
        matches!(self, AttrType::Collection | AttrType::Model)
    }

    /// True for the three tags that coerce to a timestamp.
    pub fn is_temporal(&self) -> bool {
        matches!(self, AttrType::Date | AttrType::DateTime | AttrType::Time)
    }

    /// True when a bare (non-object) raw value of this JSON kind can stand in
    /// for an attribute of this tag. Used for identity-attribute promotion.
    pub fn matches_bare(&self, raw: &Value) -> bool {
        match self {
            AttrType::Number => raw.is_number(),
            AttrType::String => raw.is_string(),
            AttrType::Boolean => raw.is_boolean(),
            _ => false,
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AttrType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "number" => Ok(AttrType::Number),
            "string" => Ok(AttrType::String),
            "boolean" => Ok(AttrType::Boolean),
            "date" => Ok(AttrType::Date),
            "datetime" => Ok(AttrType::DateTime),
            "time" => Ok(AttrType::Time),
            "collection" => Ok(AttrType::Collection),
            "array" => Ok(AttrType::Array),
            "model" => Ok(AttrType::Model),
            "ignore" => Ok(AttrType::Ignore),
            other => Err(SchemaError::UnknownTypeTag(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tags_round_trip_through_strings() {
        for tag in [
            AttrType::Number,
            AttrType::String,
            AttrType::Boolean,
            AttrType::Date,
            AttrType::DateTime,
            AttrType::Time,
            AttrType::Collection,
            AttrType::Array,
            AttrType::Model,
            AttrType::Ignore,
        ] {
            assert_eq!(tag.as_str().parse::<AttrType>().ok(), Some(tag));
        }
    }

    #[test]
    fn unknown_tag_is_a_schema_error() {
        let err = "uuid".parse::<AttrType>().unwrap_err();
        assert!(matches!(err, SchemaError::UnknownTypeTag(tag) if tag == "uuid"));
    }

    #[test]
    fn serde_uses_lowercase_tags() {
        assert_eq!(serde_json::to_value(AttrType::DateTime).ok(), Some(json!("datetime")));
        let parsed: AttrType = serde_json::from_value(json!("collection")).unwrap();
        assert_eq!(parsed, AttrType::Collection);
    }

    #[test]
    fn bare_matching_covers_scalar_tags_only() {
        assert!(AttrType::Number.matches_bare(&json!(7)));
        assert!(AttrType::String.matches_bare(&json!("abc")));
        assert!(AttrType::Boolean.matches_bare(&json!(true)));
        assert!(!AttrType::Date.matches_bare(&json!("2024-01-01")));
        assert!(!AttrType::Number.matches_bare(&json!("7")));
    }
}
