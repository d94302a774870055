//! Query pipeline over an in-memory snapshot: filter, search, sort, then paginate or render CSV.
//!
//! Search and sort both run on the full pre-pagination set; `total` is counted before slicing.

use std::cmp::Ordering;

use super::csv::to_csv;
use super::filter::apply_filters;
use super::params::{OrderKey, OutputFormat, QueryParams};
use crate::config::{searchable_fields, FieldDescriptor};
use crate::model::{FieldValue, Record};

/// Result of running a query.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryOutput {
    /// One page of records and the count of all matches.
    Page { records: Vec<Record>, total: usize },
    /// Every match rendered as CSV.
    Csv(String),
}

/// Run the full pipeline. `fields` decides which fields are searched and the CSV columns.
pub fn execute(records: Vec<Record>, params: &QueryParams, fields: &[FieldDescriptor]) -> QueryOutput {
    let matched = select(records, params, fields);
    match params.format {
        OutputFormat::Csv => QueryOutput::Csv(to_csv(&matched, fields)),
        OutputFormat::Json => {
            let total = matched.len();
            let records = paginate(matched, params);
            QueryOutput::Page { records, total }
        }
    }
}

/// Filter, search and sort without paginating.
pub fn select(records: Vec<Record>, params: &QueryParams, fields: &[FieldDescriptor]) -> Vec<Record> {
    let filtered = apply_filters(records, &params.filters);
    let searched = match params.search.as_deref() {
        Some(term) if !term.is_empty() => {
            apply_search(filtered, term, &searchable_fields(fields))
        }
        _ => filtered,
    };
    apply_sorting(searched, &params.ordering)
}

/// Keep records where any of `fields` contains `term`, case-insensitively. With no fields nothing matches.
pub fn apply_search(records: Vec<Record>, term: &str, fields: &[&str]) -> Vec<Record> {
    let needle = term.to_lowercase();
    records
        .into_iter()
        .filter(|r| {
            fields
                .iter()
                .any(|f| r.get(f).display_string().to_lowercase().contains(&needle))
        })
        .collect()
}

/// Stable multi-key sort. Nulls sort after non-null values in both directions; equal keys fall
/// through to the next one. No keys keeps input order.
pub fn apply_sorting(mut records: Vec<Record>, ordering: &[OrderKey]) -> Vec<Record> {
    if ordering.is_empty() {
        return records;
    }
    records.sort_by(|a, b| {
        for key in ordering {
            let (x, y) = (a.get(&key.field), b.get(&key.field));
            let ord = match (x.is_null(), y.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => {
                    let o = compare_values(x, y);
                    if key.descending {
                        o.reverse()
                    } else {
                        o
                    }
                }
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    records
}

/// Slice out the requested page. Out-of-range pages are empty.
pub fn paginate(records: Vec<Record>, params: &QueryParams) -> Vec<Record> {
    let Some(start) = params.offset() else {
        return Vec::new();
    };
    records.into_iter().skip(start).take(params.page_size).collect()
}

/// Ordering between two non-null values. Values of different kinds order by kind.
fn compare_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a, b) {
        (FieldValue::Integer(x), FieldValue::Integer(y)) => x.cmp(y),
        (FieldValue::Decimal(x), FieldValue::Decimal(y)) => compare_decimals(*x, *y),
        (FieldValue::Integer(x), FieldValue::Decimal(y)) => compare_int_decimal(*x, *y),
        (FieldValue::Decimal(x), FieldValue::Integer(y)) => compare_int_decimal(*y, *x).reverse(),
        (FieldValue::Text(x), FieldValue::Text(y)) => x.cmp(y),
        (FieldValue::Boolean(x), FieldValue::Boolean(y)) => x.cmp(y),
        (FieldValue::Timestamp(x), FieldValue::Timestamp(y)) => x.cmp(y),
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

/// `-0.0` equals `0.0`; NaN falls back to `total_cmp` (positive NaN last, negative NaN first).
fn compare_decimals(x: f64, y: f64) -> Ordering {
    x.partial_cmp(&y).unwrap_or_else(|| x.total_cmp(&y))
}

/// Exact comparison of an integer with a float, without rounding the integer through `f64`.
fn compare_int_decimal(i: i64, f: f64) -> Ordering {
    // 2^63, the first float above i64::MAX.
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() {
        return if f.is_sign_negative() { Ordering::Greater } else { Ordering::Less };
    }
    if f >= TWO_POW_63 {
        return Ordering::Less;
    }
    if f < -TWO_POW_63 {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(f - whole)).unwrap_or(Ordering::Equal),
        other => other,
    }
}

fn kind_rank(v: &FieldValue) -> u8 {
    match v {
        FieldValue::Boolean(_) => 0,
        FieldValue::Integer(_) | FieldValue::Decimal(_) => 1,
        FieldValue::Timestamp(_) => 2,
        FieldValue::Text(_) => 3,
        FieldValue::Null => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldType;

    fn people() -> Vec<Record> {
        vec![
            Record::new().with("id", 1).with("name", "Amit").with("age", 30),
            Record::new().with("id", 2).with("name", "Bela").with("age", FieldValue::Null),
            Record::new().with("id", 3).with("name", "Amitabh").with("age", 25),
        ]
    }

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("id", FieldType::Integer),
            FieldDescriptor::new("name", FieldType::String),
            FieldDescriptor::new("age", FieldType::Integer),
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

    fn page(params: &QueryParams) -> (Vec<i64>, usize) {
        match execute(people(), params, &fields()) {
            QueryOutput::Page { records, total } => (ids(&records), total),
            QueryOutput::Csv(_) => panic!("expected a page"),
        }
    }

    #[test]
    fn search_then_sort_by_age() {
        assert_eq!(page(&QueryParams::parse([("search", "ami")])), (vec![1, 3], 2));
        assert_eq!(page(&QueryParams::parse([("search", "ami"), ("ordering", "age")])), (vec![3, 1], 2));
        assert_eq!(page(&QueryParams::parse([("search", "ami"), ("ordering", "-age")])), (vec![1, 3], 2));
    }

    #[test]
    fn nulls_sort_last_in_both_directions() {
        assert_eq!(page(&QueryParams::parse([("ordering", "age")])).0, vec![3, 1, 2]);
        assert_eq!(page(&QueryParams::parse([("ordering", "-age")])).0, vec![1, 3, 2]);
    }

    #[test]
    fn ties_fall_through_to_next_key_and_sort_is_stable() {
        let records = vec![
            Record::new().with("id", 1).with("city", "Pune").with("amount", 5),
            Record::new().with("id", 2).with("city", "Delhi").with("amount", 9),
            Record::new().with("id", 3).with("city", "Pune").with("amount", 7),
            Record::new().with("id", 4).with("city", "Delhi").with("amount", 9),
        ];
        let sorted = apply_sorting(records.clone(), &OrderKey::parse_list("city,-amount"));
        assert_eq!(ids(&sorted), vec![2, 4, 3, 1]);
        let unsorted = apply_sorting(records, &[]);
        assert_eq!(ids(&unsorted), vec![1, 2, 3, 4]);
    }

    #[test]
    fn search_only_looks_at_string_fields() {
        let params = QueryParams::parse([("search", "30")]);
        assert_eq!(page(&params), (vec![], 0));
    }

    #[test]
    fn search_without_text_fields_matches_nothing() {
        let out = apply_search(people(), "ami", &[]);
        assert!(out.is_empty());
    }

    #[test]
    fn total_ignores_pagination_and_out_of_range_is_empty() {
        let p = QueryParams::parse([("page_size", "1"), ("page", "2")]);
        assert_eq!(page(&p), (vec![2], 3));
        let p = QueryParams::parse([("page_size", "2"), ("page", "9")]);
        assert_eq!(page(&p), (vec![], 3));
    }

    #[test]
    fn pages_cover_the_full_sorted_set() {
        let mut all = Vec::new();
        for n in 1..=3 {
            let n = n.to_string();
            let p = QueryParams::parse([("page_size", "1"), ("page", n.as_str()), ("ordering", "-name")]);
            all.extend(page(&p).0);
        }
        let full = QueryParams::parse([("ordering", "-name")]);
        assert_eq!(all, page(&full).0);
    }

    #[test]
    fn csv_contains_every_match_not_one_page() {
        let p = QueryParams::parse([("format", "csv"), ("page_size", "1"), ("search", "ami")]);
        match execute(people(), &p, &fields()) {
            QueryOutput::Csv(body) => assert_eq!(body, "id,name,age\n1,Amit,30\n3,Amitabh,25"),
            other => panic!("expected csv, got {:?}", other),
        }
    }

    #[test]
    fn mixed_numeric_kinds_compare_numerically() {
        assert_eq!(compare_values(&FieldValue::Integer(2), &FieldValue::Decimal(2.5)), Ordering::Less);
        assert_eq!(compare_values(&FieldValue::Boolean(true), &FieldValue::Integer(0)), Ordering::Less);
    }

    #[test]
    fn integers_past_two_pow_53_compare_exactly_with_decimals() {
        let big = 1_i64 << 53;
        let (lo, hi, float) = (FieldValue::Integer(big), FieldValue::Integer(big + 1), FieldValue::Decimal(big as f64));
        assert_eq!(compare_values(&lo, &float), Ordering::Equal);
        assert_eq!(compare_values(&hi, &float), Ordering::Greater);
        assert_eq!(compare_values(&float, &hi), Ordering::Less);
        assert_eq!(compare_values(&FieldValue::Integer(i64::MAX), &FieldValue::Decimal(9.3e18)), Ordering::Less);
        assert_eq!(compare_values(&FieldValue::Integer(-3), &FieldValue::Decimal(-2.5)), Ordering::Less);
        assert_eq!(compare_values(&FieldValue::Integer(0), &FieldValue::Decimal(-0.0)), Ordering::Equal);
        assert_eq!(compare_values(&FieldValue::Decimal(0.0), &FieldValue::Decimal(-0.0)), Ordering::Equal);
        assert_eq!(compare_values(&FieldValue::Integer(i64::MAX), &FieldValue::Decimal(f64::NAN)), Ordering::Less);

        let records = vec![
            Record::new().with("id", 1).with("v", hi),
            Record::new().with("id", 2).with("v", float),
            Record::new().with("id", 3).with("v", lo),
        ];
        let sorted = apply_sorting(records, &OrderKey::parse_list("v"));
        assert_eq!(ids(&sorted), vec![2, 3, 1]);
    }
}
