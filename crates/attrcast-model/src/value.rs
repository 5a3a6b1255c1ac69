use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::fmt;

/// A typed attribute value held in a record's attribute container.
///
/// Values are produced by the coercion engine; the container never holds a
/// nested record or collection (those live in dedicated slots), so the enum
/// covers scalars, raw arrays, and untyped passthrough only.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// An explicit JSON `null`. Kept as-is for every tag; no conversion is
    /// attempted on null input.
    Null,
    Bool(bool),
    /// Always finite. The coercion engine never stores a NaN or an infinity.
    Number(f64),
    Text(String),
    /// All three temporal tags (`date`, `datetime`, `time`) coerce here.
    Timestamp(DateTime<Utc>),
    /// Raw JSON items of an `array`-tagged attribute.
    Array(Vec<Value>),
    /// Untyped passthrough: `ignore`-tagged attributes, plus JSON objects
    /// (and non-finite numbers) wrapped verbatim by [`From<Value>`].
    Raw(Value),
}

impl AttrValue {
    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            AttrValue::Null => "null",
            AttrValue::Bool(_) => "boolean",
            AttrValue::Number(_) => "number",
            AttrValue::Text(_) => "text",
            AttrValue::Timestamp(_) => "timestamp",
            AttrValue::Array(_) => "array",
            AttrValue::Raw(_) => "raw",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            AttrValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            AttrValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Plain-data rendering. Timestamps serialize as RFC 3339 with
    /// millisecond precision and a `Z` suffix; whole numbers serialize as
    /// JSON integers so a parsed object reproduces its source.
    pub fn to_json(&self) -> Value {
        match self {
            AttrValue::Null => Value::Null,
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::Number(n) => number_to_json(*n),
            AttrValue::Text(s) => Value::String(s.clone()),
            AttrValue::Timestamp(ts) => Value::String(render_timestamp(*ts)),
            AttrValue::Array(items) => Value::Array(items.clone()),
            AttrValue::Raw(value) => value.clone(),
        }
    }

    /// Textual rendering, used by string coercion and URL parameters.
    /// Raw string values render without quotes; other raw values render as
    /// compact JSON.
    pub fn to_text(&self) -> String {
        match self {
            AttrValue::Null => "null".to_string(),
            AttrValue::Bool(b) => b.to_string(),
            AttrValue::Number(n) => n.to_string(),
            AttrValue::Text(s) => s.clone(),
            AttrValue::Timestamp(ts) => render_timestamp(*ts),
            AttrValue::Array(items) => Value::Array(items.clone()).to_string(),
            AttrValue::Raw(Value::String(s)) => s.clone(),
            AttrValue::Raw(value) => value.to_string(),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<DateTime<Utc>> for AttrValue {
    fn from(value: DateTime<Utc>) -> Self {
        AttrValue::Timestamp(value)
    }
}

/// Verbatim wrap of a raw JSON value, with no tag-driven coercion. This is
/// what a plain (non-parsing) set stores: numbers stay numbers, strings stay
/// strings even for a `number`-tagged attribute, objects land as `Raw`.
impl From<Value> for AttrValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => AttrValue::Null,
            Value::Bool(b) => AttrValue::Bool(b),
            Value::Number(n) => match n.as_f64() {
                Some(v) if v.is_finite() => AttrValue::Number(v),
                _ => AttrValue::Raw(Value::Number(n)),
            },
            Value::String(s) => AttrValue::Text(s),
            Value::Array(items) => AttrValue::Array(items),
            value @ Value::Object(_) => AttrValue::Raw(value),
        }
    }
}

/// RFC 3339, millisecond precision, `Z` suffix (`2024-01-15T10:30:00.000Z`).
pub fn render_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn number_to_json(n: f64) -> Value {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}
