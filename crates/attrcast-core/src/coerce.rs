//! The type coercion engine.
//!
//! Pure functions from raw JSON to typed attribute values, driven by the
//! record type's [`TypeMap`]. Nothing here touches a record: callers commit a
//! [`CoercedBatch`] only when the whole call succeeded, so a failed parse
//! never leaves a container partially coerced.

use attrcast_model::{AttrType, AttrValue, CoerceError, ParseReport, Strictness, TypeMap};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::warn;

/// Where one type-mapped attribute is headed after coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum CoercedValue {
    /// Flat container value.
    Plain(AttrValue),
    /// Raw payload for a `collection`/`model` tagged attribute; the record
    /// routes it to the nested instance.
    Nested(Value),
}

/// Result of coercing one flat raw object. `known` preserves input order
/// (the record applies it in type-table order regardless); `unknown` holds
/// attributes absent from the type map, in input order, and is only
/// populated by non-parsing calls under lenient strictness.
#[derive(Debug, Default)]
pub struct CoercedBatch {
    pub known: IndexMap<String, CoercedValue>,
    pub unknown: Vec<(String, Value)>,
    pub report: ParseReport,
}

/// Coerce a whole raw object against `types`.
///
/// With `parse` set, scalar values run through the per-tag conversion and
/// unknown attributes are dropped (lenient: warn + report) or fatal (strict).
/// Without it, scalar values are wrapped verbatim and unknown attributes are
/// kept in `unknown` under lenient strictness. Collection payloads must be
/// arrays (or null) either way.
pub fn coerce_attributes(
    types: &TypeMap,
    raw: Map<String, Value>,
    strictness: Strictness,
    parse: bool,
) -> Result<CoercedBatch, CoerceError> {
    let mut batch = CoercedBatch::default();
    for (name, value) in raw {
        let Some(tag) = types.get(&name) else {
            if strictness.is_strict() {
                return Err(CoerceError::UnknownAttribute {
                    attribute: name,
                    raw: value,
                });
            }
            if parse {
                warn!(attribute = %name, "unknown attribute dropped from parse");
                let err = CoerceError::UnknownAttribute {
                    attribute: name,
                    raw: value,
                };
                if let Some(issue) = err.to_issue() {
                    batch.report.push(issue);
                }
            } else {
                batch.unknown.push((name, value));
            }
            continue;
        };
        if tag.is_nested() {
            if tag == AttrType::Collection && !(value.is_array() || value.is_null()) {
                let err = CoerceError::NotASequence {
                    attribute: name,
                    raw: value,
                };
                if strictness.is_strict() {
                    return Err(err);
                }
                if let Some(issue) = err.to_issue() {
                    warn!(attribute = %issue.attribute, "dropping non-array collection payload");
                    batch.report.push(issue);
                }
                continue;
            }
            batch.known.insert(name, CoercedValue::Nested(value));
            continue;
        }
        if !parse {
            batch
                .known
                .insert(name, CoercedValue::Plain(AttrValue::from(value)));
            continue;
        }
        match coerce_value(tag, &name, &value) {
            Ok(coerced) => {
                batch.known.insert(name, CoercedValue::Plain(coerced));
            }
            Err(err) if !strictness.is_strict() => {
                let Some(issue) = err.to_issue() else {
                    return Err(err);
                };
                warn!(
                    attribute = %issue.attribute,
                    kind = %issue.kind,
                    "dropping unconvertible value"
                );
                batch.report.push(issue);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(batch)
}

/// Coerce one raw value per `tag`.
///
/// Null passes through untouched for every tag, `ignore` passes the raw
/// value through, and the nested tags validate the payload and hand it back
/// (`collection` as its items, `model` as raw) for the record layer to route.
pub fn coerce_value(tag: AttrType, attribute: &str, raw: &Value) -> Result<AttrValue, CoerceError> {
    match tag {
        AttrType::Ignore => Ok(AttrValue::Raw(raw.clone())),
        _ if raw.is_null() => Ok(AttrValue::Null),
        AttrType::Number => coerce_number(attribute, raw),
        AttrType::Boolean => Ok(coerce_boolean(raw)),
        AttrType::String => Ok(coerce_text(raw)),
        AttrType::Date | AttrType::DateTime | AttrType::Time => coerce_temporal(attribute, raw),
        AttrType::Array => match raw {
            Value::Array(items) => Ok(AttrValue::Array(items.clone())),
            other => Err(CoerceError::NotAnArray {
                attribute: attribute.to_string(),
                raw: other.clone(),
            }),
        },
        AttrType::Collection => match raw {
            Value::Array(items) => Ok(AttrValue::Array(items.clone())),
            other => Err(CoerceError::NotASequence {
                attribute: attribute.to_string(),
                raw: other.clone(),
            }),
        },
        AttrType::Model => Ok(AttrValue::Raw(raw.clone())),
    }
}

/// Promote a bare payload to `{id_attribute: value}` when its JSON kind
/// matches the identity attribute's scalar tag. Null reads as an empty
/// object; any other unpromotable non-object payload is rejected.
pub fn promote_bare(
    types: &TypeMap,
    id_attribute: &str,
    raw: Value,
) -> Result<Map<String, Value>, CoerceError> {
    match raw {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => {
            let promotable = types
                .get(id_attribute)
                .is_some_and(|tag| tag.matches_bare(&other));
            if promotable {
                let mut map = Map::new();
                map.insert(id_attribute.to_string(), other);
                Ok(map)
            } else {
                Err(CoerceError::InvalidPayload { raw: other })
            }
        }
    }
}

fn coerce_number(attribute: &str, raw: &Value) -> Result<AttrValue, CoerceError> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number_text(s),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    match parsed {
        Some(n) if n.is_finite() => Ok(AttrValue::Number(n)),
        _ => Err(CoerceError::NotNumeric {
            attribute: attribute.to_string(),
            raw: raw.clone(),
        }),
    }
}

/// Never fails: the three `true` spellings are special-cased, everything
/// else goes through the numeric cast and an unparseable value reads false.
fn coerce_boolean(raw: &Value) -> AttrValue {
    let flag = match raw {
        Value::Bool(b) => *b,
        Value::String(s) => match s.as_str() {
            "true" | "True" | "TRUE" => true,
            other => parse_number_text(other).is_some_and(|n| n != 0.0),
        },
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    };
    AttrValue::Bool(flag)
}

fn coerce_text(raw: &Value) -> AttrValue {
    let text = match raw {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(v) => AttrValue::Number(v).to_text(),
            None => n.to_string(),
        },
        other => other.to_string(),
    };
    AttrValue::Text(text)
}

fn coerce_temporal(attribute: &str, raw: &Value) -> Result<AttrValue, CoerceError> {
    let stamp = match raw {
        Value::String(s) => parse_timestamp_text(s),
        Value::Number(n) => n.as_f64().and_then(millis_to_stamp),
        _ => None,
    };
    stamp
        .map(AttrValue::Timestamp)
        .ok_or_else(|| CoerceError::InvalidDate {
            attribute: attribute.to_string(),
            raw: raw.clone(),
        })
}

/// Numeric cast of a string: whitespace-only parses as zero, anything else
/// must be a finite decimal or scientific literal.
fn parse_number_text(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM[:SS[.fff]]` (read as UTC so the
/// result does not depend on ambient timezone) and bare `YYYY-MM-DD`
/// (midnight UTC). Sub-millisecond digits are truncated: a stored stamp
/// never carries more precision than its rendering, so re-parsing the
/// rendering reproduces it exactly.
fn parse_timestamp_text(s: &str) -> Option<DateTime<Utc>> {
    let trimmed = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return truncate_to_millis(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return truncate_to_millis(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    None
}

fn truncate_to_millis(dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(dt.timestamp_millis()).single()
}

fn millis_to_stamp(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt(millis.trunc() as i64).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use attrcast_model::IssueKind;
    use serde_json::json;

    fn types() -> TypeMap {
        TypeMap::builder()
            .attr("id", AttrType::Number)
            .attr("title", AttrType::String)
            .attr("done", AttrType::Boolean)
            .attr("due", AttrType::Date)
            .attr("tags", AttrType::Array)
            .attr("extra", AttrType::Ignore)
            .attr("items", AttrType::Collection)
            .build()
            .unwrap()
    }

    #[test]
    fn numeric_strings_cast_to_numbers() {
        let coerced = coerce_value(AttrType::Number, "id", &json!("42")).unwrap();
        assert_eq!(coerced, AttrValue::Number(42.0));
        assert_eq!(
            coerce_value(AttrType::Number, "id", &json!("  1e3 ")).unwrap(),
            AttrValue::Number(1000.0)
        );
        assert_eq!(
            coerce_value(AttrType::Number, "id", &json!("")).unwrap(),
            AttrValue::Number(0.0)
        );
    }

    #[test]
    fn unparseable_numbers_fail_and_never_store_nan() {
        for raw in [json!("abc"), json!("NaN"), json!("inf"), json!([1])] {
            let err = coerce_value(AttrType::Number, "id", &raw).unwrap_err();
            assert!(matches!(err, CoerceError::NotNumeric { .. }), "{raw}");
        }
    }

    #[test]
    fn boolean_spellings_and_numeric_fallback() {
        for (raw, expected) in [
            (json!(true), true),
            (json!("true"), true),
            (json!("True"), true),
            (json!("TRUE"), true),
            (json!("1"), true),
            (json!(2), true),
            (json!("0"), false),
            (json!(0), false),
            (json!("false"), false),
            (json!("yes"), false),
            (json!(""), false),
            (json!([1, 2]), false),
        ] {
            assert_eq!(
                coerce_value(AttrType::Boolean, "done", &raw).unwrap(),
                AttrValue::Bool(expected),
                "{raw}"
            );
        }
    }

    #[test]
    fn date_strings_and_epoch_millis_parse() {
        let midnight = coerce_value(AttrType::Date, "due", &json!("2024-01-15")).unwrap();
        assert_eq!(midnight.to_json(), json!("2024-01-15T00:00:00.000Z"));

        let stamped =
            coerce_value(AttrType::DateTime, "due", &json!("2024-01-15T10:30:00Z")).unwrap();
        assert_eq!(stamped.to_json(), json!("2024-01-15T10:30:00.000Z"));

        let naive = coerce_value(AttrType::DateTime, "due", &json!("2024-01-15T10:30:00")).unwrap();
        assert_eq!(naive, stamped);

        let from_millis = coerce_value(AttrType::Time, "due", &json!(1_705_314_600_000_i64)).unwrap();
        assert_eq!(from_millis.to_json(), json!("2024-01-15T10:30:00.000Z"));
    }

    #[test]
    fn sub_millisecond_digits_truncate_at_parse() {
        let stamp = coerce_value(
            AttrType::DateTime,
            "due",
            &json!("2024-01-15T10:30:00.123456Z"),
        )
        .unwrap();
        assert_eq!(stamp.to_json(), json!("2024-01-15T10:30:00.123Z"));
        // re-parsing the rendering reproduces the stored value
        let again = coerce_value(AttrType::DateTime, "due", &stamp.to_json()).unwrap();
        assert_eq!(again, stamp);

        let naive = coerce_value(
            AttrType::DateTime,
            "due",
            &json!("2024-01-15T10:30:00.123999"),
        )
        .unwrap();
        assert_eq!(naive.to_json(), json!("2024-01-15T10:30:00.123Z"));
    }

    #[test]
    fn invalid_dates_are_errors() {
        let err = coerce_value(AttrType::Date, "due", &json!("not a date")).unwrap_err();
        assert!(matches!(err, CoerceError::InvalidDate { .. }));
        let err = coerce_value(AttrType::Date, "due", &json!(f64::MAX)).unwrap_err();
        assert!(matches!(err, CoerceError::InvalidDate { .. }));
    }

    #[test]
    fn strings_render_other_scalars() {
        assert_eq!(
            coerce_value(AttrType::String, "title", &json!(42)).unwrap(),
            AttrValue::Text("42".into())
        );
        assert_eq!(
            coerce_value(AttrType::String, "title", &json!(true)).unwrap(),
            AttrValue::Text("true".into())
        );
        assert_eq!(
            coerce_value(AttrType::String, "title", &json!({"a": 1})).unwrap(),
            AttrValue::Text(r#"{"a":1}"#.into())
        );
    }

    #[test]
    fn null_passes_through_every_tag() {
        for tag in [
            AttrType::Number,
            AttrType::String,
            AttrType::Boolean,
            AttrType::Date,
            AttrType::Array,
        ] {
            assert_eq!(coerce_value(tag, "x", &Value::Null).unwrap(), AttrValue::Null);
        }
    }

    #[test]
    fn ignore_passes_anything_through() {
        let raw = json!({"complex": [1, 2, 3]});
        assert_eq!(
            coerce_value(AttrType::Ignore, "extra", &raw).unwrap(),
            AttrValue::Raw(raw)
        );
    }

    #[test]
    fn batch_parse_drops_unknowns_leniently() {
        let raw = json!({"id": "7", "nickname": "zed"});
        let Value::Object(map) = raw else { unreachable!() };
        let batch = coerce_attributes(&types(), map, Strictness::Lenient, true).unwrap();
        assert_eq!(
            batch.known.get("id"),
            Some(&CoercedValue::Plain(AttrValue::Number(7.0)))
        );
        assert!(batch.unknown.is_empty());
        assert_eq!(batch.report.dropped_count(), 1);
        assert_eq!(batch.report.issues[0].kind, IssueKind::UnknownAttribute);
    }

    #[test]
    fn batch_strict_rejects_unknowns() {
        let raw = json!({"nickname": "zed"});
        let Value::Object(map) = raw else { unreachable!() };
        let err = coerce_attributes(&types(), map, Strictness::Strict, true).unwrap_err();
        assert!(matches!(err, CoerceError::UnknownAttribute { attribute, .. } if attribute == "nickname"));
    }

    #[test]
    fn batch_without_parse_wraps_and_keeps_unknowns() {
        let raw = json!({"id": "7", "nickname": "zed", "items": [1]});
        let Value::Object(map) = raw else { unreachable!() };
        let batch = coerce_attributes(&types(), map, Strictness::Lenient, false).unwrap();
        // no coercion: the numeric string stays text
        assert_eq!(
            batch.known.get("id"),
            Some(&CoercedValue::Plain(AttrValue::Text("7".into())))
        );
        assert_eq!(batch.unknown, vec![("nickname".to_string(), json!("zed"))]);
        assert_eq!(
            batch.known.get("items"),
            Some(&CoercedValue::Nested(json!([1])))
        );
    }

    #[test]
    fn non_array_collection_payloads_drop_or_abort() {
        let raw = json!({"items": 5});
        let Value::Object(map) = raw.clone() else { unreachable!() };
        let batch = coerce_attributes(&types(), map, Strictness::Lenient, true).unwrap();
        assert!(batch.known.is_empty());
        assert!(batch.unknown.is_empty());
        assert_eq!(batch.report.issues[0].kind, IssueKind::NotASequence);

        let Value::Object(map) = raw else { unreachable!() };
        let err = coerce_attributes(&types(), map, Strictness::Strict, true).unwrap_err();
        assert!(matches!(err, CoerceError::NotASequence { .. }));
    }

    #[test]
    fn bare_payloads_promote_to_the_identity_attribute() {
        let map = promote_bare(&types(), "id", json!(7)).unwrap();
        assert_eq!(map.get("id"), Some(&json!(7)));

        let err = promote_bare(&types(), "id", json!("abc")).unwrap_err();
        assert!(matches!(err, CoerceError::InvalidPayload { .. }));

        assert!(promote_bare(&types(), "id", Value::Null).unwrap().is_empty());

        let passthrough = promote_bare(&types(), "id", json!({"title": "x"})).unwrap();
        assert_eq!(passthrough.get("title"), Some(&json!("x")));
    }
}
