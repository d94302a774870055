//! Loosely-typed flat records: field name -> small closed value variant.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::config::FieldType;

/// One cell of a record.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum FieldValue {
    #[default]
    Null,
    Integer(i64),
    Decimal(f64),
    Text(String),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Numeric view used by the comparison operators. Text uses a leading-prefix parse;
    /// null and booleans have no numeric value.
    pub fn as_number(&self) -> f64 {
        match self {
            FieldValue::Integer(n) => *n as f64,
            FieldValue::Decimal(f) => *f,
            FieldValue::Text(s) => parse_float_prefix(s),
            FieldValue::Timestamp(t) => t.timestamp_millis() as f64,
            FieldValue::Null | FieldValue::Boolean(_) => f64::NAN,
        }
    }

    /// Text rendering used by `like`, search and CSV. Null renders as the empty string.
    pub fn display_string(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Integer(n) => n.to_string(),
            FieldValue::Decimal(f) => f.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Timestamp(t) => t.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }

    /// Convert an incoming JSON value without type hints. Nested arrays/objects are kept as JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Decimal(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => FieldValue::Text(value.to_string()),
        }
    }

    /// Convert an incoming JSON value guided by the declared field type. Values that do not fit the
    /// declared type fall back to [`FieldValue::from_json`].
    pub fn from_json_typed(value: &Value, field_type: FieldType) -> Self {
        match (field_type, value) {
            (FieldType::Timestamp, Value::String(s)) => match DateTime::parse_from_rfc3339(s) {
                Ok(t) => FieldValue::Timestamp(t.with_timezone(&Utc)),
                Err(_) => FieldValue::Text(s.clone()),
            },
            (FieldType::Decimal, Value::Number(n)) => FieldValue::Decimal(n.as_f64().unwrap_or(f64::NAN)),
            (FieldType::Decimal, Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(f) => FieldValue::Decimal(f),
                Err(_) => FieldValue::Text(s.clone()),
            },
            (FieldType::Integer, Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(i) => FieldValue::Integer(i),
                Err(_) => FieldValue::Text(s.clone()),
            },
            _ => FieldValue::from_json(value),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_none(),
            FieldValue::Integer(n) => serializer.serialize_i64(*n),
            FieldValue::Decimal(f) => serializer.serialize_f64(*f),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Boolean(b) => serializer.serialize_bool(*b),
            FieldValue::Timestamp(_) => serializer.serialize_str(&self.display_string()),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Integer(n.into())
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Decimal(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(t: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(t)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// A flat record. Missing fields read as null.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, FieldValue>);

static NULL: FieldValue = FieldValue::Null;

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> &FieldValue {
        self.0.get(field).unwrap_or(&NULL)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.0.remove(field)
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overwrite this record's fields with every field present in `patch`.
    pub fn merge(&mut self, patch: Record) {
        self.0.extend(patch.0);
    }

    /// Build a record from a JSON object. Returns `None` for any other JSON shape.
    pub fn from_json_object(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Record(
            obj.iter().map(|(k, v)| (k.clone(), FieldValue::from_json(v))).collect(),
        ))
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Record(iter.into_iter().collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, FieldValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Parse the longest leading floating-point prefix of `s` (after leading whitespace).
/// Returns NaN when no digits are found. `"30abc"` -> 30, `"abc"` -> NaN, `"-1.5e3x"` -> -1500.
pub fn parse_float_prefix(s: &str) -> f64 {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    if s[i..].starts_with("Infinity") {
        return if bytes.first() == Some(&b'-') { f64::NEG_INFINITY } else { f64::INFINITY };
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut mantissa_digits = i - digits_start;
    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        mantissa_digits += j - frac_start;
        if mantissa_digits > 0 {
            i = j;
        }
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    s[..i].parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_prefix_parses_leading_number() {
        assert_eq!(parse_float_prefix("30"), 30.0);
        assert_eq!(parse_float_prefix("  30abc"), 30.0);
        assert_eq!(parse_float_prefix("-1.5e3x"), -1500.0);
        assert_eq!(parse_float_prefix(".5"), 0.5);
        assert_eq!(parse_float_prefix("7."), 7.0);
        assert_eq!(parse_float_prefix("1e"), 1.0);
        assert!(parse_float_prefix("abc").is_nan());
        assert!(parse_float_prefix("").is_nan());
        assert!(parse_float_prefix(".").is_nan());
        assert_eq!(parse_float_prefix("-Infinity"), f64::NEG_INFINITY);
    }

    #[test]
    fn null_and_boolean_are_not_numbers() {
        assert!(FieldValue::Null.as_number().is_nan());
        assert!(FieldValue::Boolean(true).as_number().is_nan());
        assert_eq!(FieldValue::Text("2024-01-02".into()).as_number(), 2024.0);
    }

    #[test]
    fn missing_field_reads_as_null() {
        let r = Record::new().with("id", 1);
        assert_eq!(r.get("id"), &FieldValue::Integer(1));
        assert!(r.get("age").is_null());
    }

    #[test]
    fn serializes_as_flat_json() {
        let r = Record::new().with("id", 2).with("name", "Bela").with("age", FieldValue::Null);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json, serde_json::json!({"id": 2, "name": "Bela", "age": null}));
    }

    #[test]
    fn typed_json_conversion_parses_timestamps() {
        let v = serde_json::json!("2024-03-01T10:00:00Z");
        match FieldValue::from_json_typed(&v, FieldType::Timestamp) {
            FieldValue::Timestamp(t) => assert_eq!(t.timestamp(), 1_709_287_200),
            other => panic!("expected timestamp, got {:?}", other),
        }
        assert_eq!(
            FieldValue::from_json_typed(&serde_json::json!("12"), FieldType::Integer),
            FieldValue::Integer(12)
        );
    }
}
