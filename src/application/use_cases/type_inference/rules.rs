use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::domain::dataset::FieldType;

/// Date-only patterns accepted by the date rule
pub const DATE_ONLY_FORMATS: &[&str] = &["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d"];

/// Date-time patterns accepted by the date rule (RFC 3339 is tried as well)
pub const DATE_TIME_FORMATS: &[&str] = &[
    "%m/%d/%y %I:%M:%S %p",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DATE_MIN_LEN: usize = 8;
const DATE_MAX_LEN: usize = 19;

const STRING_KEY_MARKERS: [&str; 3] = ["name", "summary", "reference"];

pub type RulePredicate = fn(key: &str, value: &Value) -> bool;

/// One step of type inference: when `predicate` holds for the lower-cased key
/// and the raw value, the result is `field_type` and later rules are skipped.
#[derive(Clone, Copy)]
pub struct InferenceRule {
    pub name: &'static str,
    pub field_type: FieldType,
    predicate: RulePredicate,
}

impl InferenceRule {
    pub const fn new(name: &'static str, field_type: FieldType, predicate: RulePredicate) -> Self {
        Self {
            name,
            field_type,
            predicate,
        }
    }

    pub fn matches(&self, key: &str, value: &Value) -> bool {
        (self.predicate)(key, value)
    }
}

impl std::fmt::Debug for InferenceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceRule")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .finish()
    }
}

/// Rules in priority order. Key-name overrides precede value heuristics and
/// the boolean rule precedes the number rule.
pub fn default_rules() -> Vec<InferenceRule> {
    vec![
        InferenceRule::new("empty", FieldType::Skip, is_empty),
        InferenceRule::new("nested", FieldType::String, is_nested),
        InferenceRule::new("string_key", FieldType::String, has_string_key),
        InferenceRule::new("date_key", FieldType::Date, has_date_key),
        InferenceRule::new("boolean", FieldType::Boolean, is_boolean),
        InferenceRule::new("number", FieldType::Number, is_number),
        InferenceRule::new("date", FieldType::Date, is_date),
    ]
}

/// Runtime type of a value no rule claimed
pub fn primitive_type(value: &Value) -> FieldType {
    match value {
        Value::Number(_) => FieldType::Number,
        Value::Bool(_) => FieldType::Boolean,
        _ => FieldType::String,
    }
}

/// Text form of a scalar value; `None` for null and nested values
fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn is_empty(_key: &str, value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Null => true,
        _ => false,
    }
}

fn is_nested(_key: &str, value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_))
}

fn has_string_key(key: &str, _value: &Value) -> bool {
    STRING_KEY_MARKERS.iter().any(|marker| key.contains(marker))
}

fn has_date_key(key: &str, _value: &Value) -> bool {
    key.contains("date")
}

fn is_boolean(key: &str, value: &Value) -> bool {
    let Some(text) = scalar_text(value) else {
        return false;
    };
    if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false") {
        return true;
    }
    key.starts_with("is") && (text == "0" || text == "1")
}

fn is_number(_key: &str, value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => {
            !s.contains(' ') && s.parse::<f64>().map(|n| n.is_finite()).unwrap_or(false)
        }
        _ => false,
    }
}

fn is_date(_key: &str, value: &Value) -> bool {
    let Value::String(text) = value else {
        return false;
    };
    let len = text.chars().count();
    (DATE_MIN_LEN..=DATE_MAX_LEN).contains(&len) && parses_as_date(text)
}

pub fn parses_as_date(text: &str) -> bool {
    DATE_ONLY_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(text, fmt).is_ok())
        || DATE_TIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(text, fmt).is_ok())
        || DateTime::parse_from_rfc3339(text).is_ok()
}
