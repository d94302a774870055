//! Query-string parsing: pagination, ordering, search, format and `field__op=value` filters.

use std::num::IntErrorKind;

use super::filter::{FilterClause, FilterOperator, FilterValue};

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 200;

/// Response format of the list endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

/// One ordering key. `-field` means descending.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderKey {
    pub field: String,
    pub descending: bool,
}

impl OrderKey {
    /// Parse a comma-separated ordering string. Empty segments are skipped.
    pub fn parse_list(ordering: &str) -> Vec<OrderKey> {
        ordering
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix('-') {
                Some(field) => OrderKey {
                    field: field.to_string(),
                    descending: true,
                },
                None => OrderKey {
                    field: s.to_string(),
                    descending: false,
                },
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueryParams {
    pub page: usize,
    pub page_size: usize,
    pub ordering: Vec<OrderKey>,
    pub search: Option<String>,
    pub format: OutputFormat,
    pub filters: Vec<FilterClause>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            ordering: Vec::new(),
            search: None,
            format: OutputFormat::Json,
            filters: Vec::new(),
        }
    }
}

/// Operator suffixes, longest first so `__gte` is not read as `__gt` + `e`.
const SUFFIXES: &[(&str, FilterOperator)] = &[
    ("__gte", FilterOperator::Gte),
    ("__lte", FilterOperator::Lte),
    ("__like", FilterOperator::Like),
    ("__gt", FilterOperator::Gt),
    ("__lt", FilterOperator::Lt),
    ("__in", FilterOperator::In),
];

impl QueryParams {
    /// Build from raw query pairs. Unparseable page numbers fall back to defaults; `page_size` is
    /// clamped to `[1, 200]`. Field names are not checked against any model.
    pub fn parse<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = QueryParams::default();
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "page" => params.page = parse_page(value),
                "page_size" => params.page_size = parse_page_size(value),
                "ordering" => params.ordering = OrderKey::parse_list(value),
                "search" => {
                    params.search = Some(value.to_string()).filter(|s| !s.is_empty());
                }
                "format" => {
                    params.format = if value.eq_ignore_ascii_case("csv") {
                        OutputFormat::Csv
                    } else {
                        OutputFormat::Json
                    };
                }
                _ => params.filters.push(parse_filter(key, value)),
            }
        }
        params
    }

    /// Zero-based offset of the requested page, or `None` when it overflows.
    pub fn offset(&self) -> Option<usize> {
        (self.page - 1).checked_mul(self.page_size)
    }
}

fn parse_page(value: &str) -> usize {
    match value.trim().parse::<i64>() {
        Ok(n) if n >= 1 => usize::try_from(n).unwrap_or(usize::MAX),
        Ok(_) => DEFAULT_PAGE,
        // Too large to represent: past the last page, so the slice is empty.
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => usize::MAX,
        Err(_) => DEFAULT_PAGE,
    }
}

fn parse_page_size(value: &str) -> usize {
    match value.trim().parse::<i64>() {
        Ok(n) => n.clamp(1, MAX_PAGE_SIZE as i64) as usize,
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => MAX_PAGE_SIZE,
            IntErrorKind::NegOverflow => 1,
            _ => DEFAULT_PAGE_SIZE,
        },
    }
}

fn parse_filter(key: &str, value: &str) -> FilterClause {
    for (suffix, operator) in SUFFIXES {
        if let Some(field) = key.strip_suffix(suffix) {
            let value = match operator {
                FilterOperator::In => FilterValue::List(value.split(',').map(str::to_string).collect()),
                _ => FilterValue::Single(value.to_string()),
            };
            return FilterClause {
                field: field.to_string(),
                operator: *operator,
                value,
            };
        }
    }
    FilterClause {
        field: key.to_string(),
        operator: FilterOperator::Eq,
        value: FilterValue::Single(value.to_string()),
    }
}
