//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for one introspected table.

use super::PgBindValue;
use crate::model::{Record, RecordId};

/// One column as read from the catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct PgColumn {
    pub name: String,
    /// Full SQL type (e.g. `character varying(20)`), used for placeholder casts.
    pub sql_type: String,
    /// Base type name (e.g. `varchar`, `int4`).
    pub udt_name: String,
    pub is_enum: bool,
}

/// Table addressed by the generic accessor. Identifiers come from the catalog only.
#[derive(Clone, Debug, PartialEq)]
pub struct TableSpec {
    pub schema: String,
    pub table: String,
    pub primary_key: String,
    pub columns: Vec<PgColumn>,
}

impl TableSpec {
    fn column(&self, name: &str) -> Option<&PgColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn qualified(&self) -> String {
        format!("{}.{}", quoted(&self.schema), quoted(&self.table))
    }
}

/// Quote identifier for PostgreSQL.
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Types sqlx decodes into a record value directly.
const NATIVE_TYPES: &[&str] = &[
    "int2", "int4", "int8", "float4", "float8", "bool", "text", "varchar", "bpchar", "name", "uuid", "json",
    "jsonb", "timestamptz", "timestamp", "date",
];

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: PgBindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// SELECT list: native types as-is, numeric/money as float8, everything else (enums, intervals, arrays) as text.
fn select_column_list(spec: &TableSpec) -> String {
    spec.columns
        .iter()
        .map(|c| {
            let q = quoted(&c.name);
            if !c.is_enum && NATIVE_TYPES.contains(&c.udt_name.as_str()) {
                q
            } else if c.udt_name == "numeric" || c.udt_name == "money" {
                format!("{}::float8 AS {}", q, q)
            } else {
                format!("{}::text AS {}", q, q)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholder(n: usize, column: &PgColumn) -> String {
    format!("${}::{}", n, column.sql_type)
}

/// SELECT every row ordered by primary key.
pub fn select_all(spec: &TableSpec) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        select_column_list(spec),
        spec.qualified(),
        quoted(&spec.primary_key)
    );
    q
}

/// SELECT by primary key.
pub fn select_by_id(spec: &TableSpec, id: &RecordId) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id.into());
    let pk_cast = spec
        .column(&spec.primary_key)
        .map(|c| placeholder(n, c))
        .unwrap_or_else(|| format!("${}", n));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(spec),
        spec.qualified(),
        quoted(&spec.primary_key),
        pk_cast
    );
    q
}

/// INSERT the record's known columns; columns it omits take their database default.
pub fn insert(spec: &TableSpec, record: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for (name, value) in record.iter() {
        let Some(c) = spec.column(name) else { continue };
        let n = q.push_param(value.into());
        cols.push(quoted(name));
        placeholders.push(placeholder(n, c));
    }
    let returning = select_column_list(spec);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", spec.qualified(), returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            spec.qualified(),
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id: SET only known, non-key columns present in the record. Touches `updated_at`
/// when the table has one and the record does not set it. With nothing to set, selects the row.
pub fn update(spec: &TableSpec, id: &RecordId, record: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (name, value) in record.iter() {
        if *name == spec.primary_key {
            continue;
        }
        let Some(c) = spec.column(name) else { continue };
        let n = q.push_param(value.into());
        sets.push(format!("{} = {}", quoted(name), placeholder(n, c)));
    }
    if sets.is_empty() {
        return select_by_id(spec, id);
    }
    if spec.column("updated_at").is_some() && !record.contains("updated_at") {
        sets.push(format!("{} = NOW()", quoted("updated_at")));
    }
    let id_param = q.push_param(id.into());
    let pk_cast = spec
        .column(&spec.primary_key)
        .map(|c| placeholder(id_param, c))
        .unwrap_or_else(|| format!("${}", id_param));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        spec.qualified(),
        sets.join(", "),
        quoted(&spec.primary_key),
        pk_cast,
        select_column_list(spec)
    );
    q
}

/// DELETE by id, returning the key of the deleted row.
pub fn delete(spec: &TableSpec, id: &RecordId) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id.into());
    let pk_cast = spec
        .column(&spec.primary_key)
        .map(|c| placeholder(n, c))
        .unwrap_or_else(|| format!("${}", n));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        spec.qualified(),
        quoted(&spec.primary_key),
        pk_cast,
        quoted(&spec.primary_key)
    );
    q
}
