//! Catalog discovery: tables of a schema and their columns as field descriptors.

use sqlx::{PgPool, Row};
use std::sync::Arc;

use crate::config::{FieldDescriptor, FieldType};
use crate::error::AppError;
use crate::model::{display_name_for_table, AccessorError, ModelDescriptor, ModelRegistry};
use crate::service::PgTableAccessor;
use crate::sql::{PgColumn, TableSpec};

/// A discovered table: the SQL shape plus the field metadata served by `/meta`.
#[derive(Clone, Debug)]
pub struct IntrospectedTable {
    pub spec: TableSpec,
    pub fields: Vec<FieldDescriptor>,
}

/// Base tables of `schema`, by name. Tables starting with `_` are internal and skipped.
pub async fn discover_tables(pool: &PgPool, schema: &str) -> Result<Vec<String>, AccessorError> {
    let rows = sqlx::query(
        "SELECT table_name::text AS table_name FROM information_schema.tables \
         WHERE table_schema = $1 AND table_type = 'BASE TABLE' AND table_name NOT LIKE '\\_%' \
         ORDER BY table_name",
    )
    .bind(schema)
    .fetch_all(pool)
    .await?;
    rows.iter()
        .map(|r| r.try_get::<String, _>("table_name").map_err(AccessorError::from))
        .collect()
}

const COLUMNS_SQL: &str = r#"
SELECT a.attname::text AS name,
       format_type(a.atttypid, a.atttypmod) AS sql_type,
       t.typname::text AS udt_name,
       t.typtype::text AS type_kind,
       a.attnotnull AS not_null,
       a.atthasdef AS has_default,
       EXISTS (SELECT 1 FROM pg_index i
               WHERE i.indrelid = c.oid AND i.indisprimary AND a.attnum = ANY(i.indkey)) AS is_pk,
       EXISTS (SELECT 1 FROM pg_index i
               WHERE i.indrelid = c.oid AND i.indisunique AND i.indnatts = 1 AND i.indkey[0] = a.attnum) AS is_unique,
       (SELECT fc.relname::text FROM pg_constraint k JOIN pg_class fc ON fc.oid = k.confrelid
         WHERE k.conrelid = c.oid AND k.contype = 'f' AND a.attnum = ANY(k.conkey) LIMIT 1) AS ref_table,
       ARRAY(SELECT e.enumlabel::text FROM pg_enum e
             WHERE e.enumtypid = a.atttypid ORDER BY e.enumsortorder) AS choices
FROM pg_attribute a
JOIN pg_class c ON c.oid = a.attrelid
JOIN pg_namespace n ON n.oid = c.relnamespace
JOIN pg_type t ON t.oid = a.atttypid
WHERE n.nspname = $1 AND c.relname = $2 AND a.attnum > 0 AND NOT a.attisdropped
ORDER BY a.attnum
"#;

/// Read one table's columns. Required = NOT NULL without default and not key; readonly = key or
/// server default; unique = key or single-column unique index; references = FK target table.
pub async fn introspect_table(pool: &PgPool, schema: &str, table: &str) -> Result<IntrospectedTable, AccessorError> {
    tracing::debug!(schema = %schema, table = %table, "introspecting");
    let rows = sqlx::query(COLUMNS_SQL)
        .bind(schema)
        .bind(table)
        .fetch_all(pool)
        .await?;

    let mut columns = Vec::with_capacity(rows.len());
    let mut fields = Vec::with_capacity(rows.len());
    let mut primary_key = None;
    for row in &rows {
        let name: String = row.try_get("name")?;
        let udt_name: String = row.try_get("udt_name")?;
        let is_enum = row.try_get::<String, _>("type_kind")? == "e";
        let not_null: bool = row.try_get("not_null")?;
        let has_default: bool = row.try_get("has_default")?;
        let is_pk: bool = row.try_get("is_pk")?;
        let is_unique: bool = row.try_get("is_unique")?;
        let ref_table: Option<String> = row.try_get("ref_table")?;
        let choices: Vec<String> = row.try_get("choices")?;

        if is_pk && primary_key.is_none() {
            primary_key = Some(name.clone());
        }
        let field_type = if is_enum { FieldType::Enum } else { field_type_for_pg(&udt_name) };
        let mut field = FieldDescriptor::new(name.clone(), field_type);
        field.required = not_null && !has_default && !is_pk;
        field.readonly = is_pk || has_default;
        field.unique = is_pk || is_unique;
        field.references = ref_table;
        if is_enum {
            field.choices = Some(choices);
        }
        fields.push(field);
        columns.push(PgColumn {
            name,
            sql_type: row.try_get("sql_type")?,
            udt_name,
            is_enum,
        });
    }

    if columns.is_empty() {
        return Err(AccessorError::Fetch(format!("table {}.{} has no columns", schema, table)));
    }
    // Tables without a primary key are addressed by their first column.
    let primary_key = primary_key.unwrap_or_else(|| columns[0].name.clone());
    Ok(IntrospectedTable {
        spec: TableSpec {
            schema: schema.to_string(),
            table: table.to_string(),
            primary_key,
            columns,
        },
        fields,
    })
}

/// Discover every table of `schema` and register it as a model backed by `PgTableAccessor`.
/// Display name is the title-cased table name; path segment is the table name with `-`.
pub async fn register_discovered(pool: &PgPool, schema: &str, registry: &mut ModelRegistry) -> Result<usize, AppError> {
    let tables = discover_tables(pool, schema).await?;
    for table in &tables {
        let introspected = introspect_table(pool, schema, table).await?;
        let accessor = Arc::new(PgTableAccessor::new(pool.clone(), introspected.spec));
        let descriptor = ModelDescriptor::new(display_name_for_table(table), table.clone(), accessor)
            .with_fields(introspected.fields);
        registry.register(descriptor)?;
    }
    tracing::info!(schema = %schema, count = tables.len(), "registered discovered tables");
    Ok(tables.len())
}

/// Map a PostgreSQL base type name to a field type.
pub fn field_type_for_pg(udt_name: &str) -> FieldType {
    match udt_name {
        "int2" | "int4" | "int8" | "serial" | "bigserial" => FieldType::Integer,
        "numeric" | "float4" | "float8" | "money" => FieldType::Decimal,
        "bool" => FieldType::Boolean,
        "timestamp" | "timestamptz" | "date" => FieldType::Timestamp,
        "text" => FieldType::Text,
        _ => FieldType::String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pg_types_map_to_field_types() {
        assert_eq!(field_type_for_pg("int8"), FieldType::Integer);
        assert_eq!(field_type_for_pg("numeric"), FieldType::Decimal);
        assert_eq!(field_type_for_pg("timestamptz"), FieldType::Timestamp);
        assert_eq!(field_type_for_pg("text"), FieldType::Text);
        assert_eq!(field_type_for_pg("varchar"), FieldType::String);
        assert_eq!(field_type_for_pg("uuid"), FieldType::String);
        assert_eq!(field_type_for_pg("bool"), FieldType::Boolean);
    }
}
