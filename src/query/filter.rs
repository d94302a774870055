//! Filter clauses evaluated against loosely-typed records.
//!
//! Numeric operators parse both sides as floating point; a side without a numeric value
//! (null, boolean, non-numeric text) is NaN and the comparison is false.

use chrono::{DateTime, Utc};

use crate::model::{parse_float_prefix, FieldValue, Record};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    In,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterValue {
    Single(String),
    List(Vec<String>),
}

/// `field operator value`. Clauses on a query are combined with AND.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterClause {
    pub field: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl FilterClause {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: FilterValue::Single(value.into()),
        }
    }

    pub fn one_of<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            operator: FilterOperator::In,
            value: FilterValue::List(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        let value = record.get(&self.field);
        let target = match (&self.value, self.operator) {
            (FilterValue::List(items), FilterOperator::In) => return items.iter().any(|t| loose_eq(value, t)),
            (FilterValue::List(_), _) => return false,
            (FilterValue::Single(target), _) => target.as_str(),
        };
        match self.operator {
            FilterOperator::Eq | FilterOperator::In => loose_eq(value, target),
            FilterOperator::Ne => !loose_eq(value, target),
            FilterOperator::Gt => compare(value, target, |a, b| a > b),
            FilterOperator::Gte => compare(value, target, |a, b| a >= b),
            FilterOperator::Lt => compare(value, target, |a, b| a < b),
            FilterOperator::Lte => compare(value, target, |a, b| a <= b),
            FilterOperator::Like => value.display_string().to_lowercase().contains(&target.to_lowercase()),
        }
    }
}

/// Keep the records matching every clause, in input order.
pub fn apply_filters(records: Vec<Record>, clauses: &[FilterClause]) -> Vec<Record> {
    if clauses.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|r| clauses.iter().all(|c| c.matches(r)))
        .collect()
}

/// Equality between a stored value and a query-string value.
pub fn loose_eq(value: &FieldValue, target: &str) -> bool {
    match value {
        FieldValue::Null => false,
        FieldValue::Integer(_) | FieldValue::Decimal(_) => value.as_number() == string_to_number(target),
        FieldValue::Text(s) => s == target,
        FieldValue::Boolean(b) => match target.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => *b,
            "false" | "0" => !*b,
            _ => false,
        },
        FieldValue::Timestamp(t) => match parse_instant(target) {
            Some(other) => *t == other,
            None => value.display_string() == target,
        },
    }
}

fn compare(value: &FieldValue, target: &str, op: fn(f64, f64) -> bool) -> bool {
    if let FieldValue::Timestamp(t) = value {
        if let Some(other) = parse_instant(target) {
            return op(t.timestamp_millis() as f64, other.timestamp_millis() as f64);
        }
    }
    op(value.as_number(), parse_float_prefix(target))
}

/// Whole-string numeric conversion: surrounding whitespace ignored, empty is zero.
fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim()).ok().map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Vec<Record> {
        vec![
            Record::new().with("id", 1).with("name", "Amit").with("age", 30),
            Record::new().with("id", 2).with("name", "Bela").with("age", FieldValue::Null),
            Record::new().with("id", 3).with("name", "Amitabh").with("age", 25),
        ]
    }

    fn ids(records: &[Record]) -> Vec<i64> {
        records
            .iter()
            .map(|r| match r.get("id") {
                FieldValue::Integer(n) => *n,
                other => panic!("unexpected id {:?}", other),
            })
            .collect()
    }

    #[test]
    fn gte_excludes_null() {
        let out = apply_filters(people(), &[FilterClause::new("age", FilterOperator::Gte, "30")]);
        assert_eq!(ids(&out), vec![1]);
    }

    #[test]
    fn lt_on_non_numeric_filter_matches_nothing() {
        let out = apply_filters(people(), &[FilterClause::new("age", FilterOperator::Lt, "young")]);
        assert!(out.is_empty());
    }

    #[test]
    fn eq_is_loose_between_numbers_and_strings() {
        let out = apply_filters(people(), &[FilterClause::new("id", FilterOperator::Eq, "3")]);
        assert_eq!(ids(&out), vec![3]);
        let out = apply_filters(people(), &[FilterClause::new("id", FilterOperator::Ne, "3")]);
        assert_eq!(ids(&out), vec![1, 2]);
        let out = apply_filters(people(), &[FilterClause::new("id", FilterOperator::Eq, " 2.0 ")]);
        assert_eq!(ids(&out), vec![2]);
    }

    #[test]
    fn like_is_case_insensitive_substring() {
        let out = apply_filters(people(), &[FilterClause::new("name", FilterOperator::Like, "AMI")]);
        assert_eq!(ids(&out), vec![1, 3]);
    }

    #[test]
    fn in_matches_any_member() {
        let out = apply_filters(people(), &[FilterClause::one_of("id", ["1", "2"])]);
        assert_eq!(ids(&out), vec![1, 2]);
        let out = apply_filters(people(), &[FilterClause::one_of("name", ["Bela", "Nobody"])]);
        assert_eq!(ids(&out), vec![2]);
    }

    #[test]
    fn clauses_combine_with_and_and_are_idempotent() {
        let clauses = [
            FilterClause::new("name", FilterOperator::Like, "ami"),
            FilterClause::new("age", FilterOperator::Lt, "28"),
        ];
        let once = apply_filters(people(), &clauses);
        assert_eq!(ids(&once), vec![3]);
        let twice = apply_filters(once.clone(), &clauses);
        assert_eq!(once, twice);
    }

    #[test]
    fn unknown_field_matches_nothing_for_eq() {
        let out = apply_filters(people(), &[FilterClause::new("nope", FilterOperator::Eq, "1")]);
        assert!(out.is_empty());
    }

    #[test]
    fn booleans_accept_words_and_digits() {
        assert!(loose_eq(&FieldValue::Boolean(true), "true"));
        assert!(loose_eq(&FieldValue::Boolean(true), "1"));
        assert!(loose_eq(&FieldValue::Boolean(false), "False"));
        assert!(!loose_eq(&FieldValue::Boolean(true), "yes"));
    }

    #[test]
    fn timestamps_compare_as_instants() {
        let t = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z").unwrap().with_timezone(&Utc);
        let r = Record::new().with("created_at", t);
        assert!(FilterClause::new("created_at", FilterOperator::Gte, "2024-05-01T00:00:00Z").matches(&r));
        assert!(!FilterClause::new("created_at", FilterOperator::Lt, "2024-05-01T12:00:00+00:00").matches(&r));
        assert!(FilterClause::new("created_at", FilterOperator::Eq, "2024-05-01T14:00:00+02:00").matches(&r));
    }
}
