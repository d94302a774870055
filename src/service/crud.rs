//! Generic CRUD execution against PostgreSQL for one discovered table.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;

use crate::model::{AccessorError, FieldValue, ModelAccessor, Operation, Record, RecordId};
use crate::sql::{delete, insert, select_all, select_by_id, update, QueryBuf, TableSpec};

const ALL_OPERATIONS: &[Operation] = &[
    Operation::List,
    Operation::GetById,
    Operation::Create,
    Operation::Update,
    Operation::Delete,
];

pub struct PgTableAccessor {
    pool: PgPool,
    spec: TableSpec,
}

impl PgTableAccessor {
    pub fn new(pool: PgPool, spec: TableSpec) -> Self {
        Self { pool, spec }
    }

    async fn query_many(&self, q: &QueryBuf) -> Result<Vec<Record>, AccessorError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn query_optional(&self, q: &QueryBuf) -> Result<Option<Record>, AccessorError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let row = query.fetch_optional(&self.pool).await?;
        Ok(row.map(|r| row_to_record(&r)))
    }
}

#[async_trait]
impl ModelAccessor for PgTableAccessor {
    async fn list(&self) -> Result<Vec<Record>, AccessorError> {
        self.query_many(&select_all(&self.spec)).await
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<Option<Record>, AccessorError> {
        self.query_optional(&select_by_id(&self.spec, id)).await
    }

    async fn create(&self, data: Record) -> Result<Record, AccessorError> {
        self.query_optional(&insert(&self.spec, &data))
            .await?
            .ok_or_else(|| AccessorError::Fetch("insert returned no row".into()))
    }

    async fn update(&self, id: &RecordId, data: Record) -> Result<Option<Record>, AccessorError> {
        self.query_optional(&update(&self.spec, id, &data)).await
    }

    async fn delete(&self, id: &RecordId) -> Result<bool, AccessorError> {
        Ok(self.query_optional(&delete(&self.spec, id)).await?.is_some())
    }

    fn operations(&self) -> &'static [Operation] {
        ALL_OPERATIONS
    }
}

fn row_to_record(row: &PgRow) -> Record {
    use sqlx::Column;
    use sqlx::Row;
    row.columns()
        .iter()
        .map(|col| (col.name().to_string(), cell_to_value(row, col.name())))
        .collect()
}

/// Decode a cell by trying the types the SELECT list can produce. Anything else is null.
fn cell_to_value(row: &PgRow, name: &str) -> FieldValue {
    use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
    use sqlx::Row;
    if let Ok(v) = row.try_get::<Option<i16>, _>(name) {
        return v.map(|n| FieldValue::Integer(n.into())).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(name) {
        return v.map(|n| FieldValue::Integer(n.into())).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(name) {
        return v.map(FieldValue::Integer).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(name) {
        return v.map(|n| FieldValue::Decimal(n.into())).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(name) {
        return v.map(FieldValue::Decimal).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(name) {
        return v.map(FieldValue::Boolean).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return v.map(|u| FieldValue::Text(u.to_string())).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<chrono::DateTime<Utc>>, _>(name) {
        return v.map(FieldValue::Timestamp).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(name) {
        return v
            .map(|d| FieldValue::Timestamp(Utc.from_utc_datetime(&d)))
            .unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(name) {
        return v
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| FieldValue::Timestamp(Utc.from_utc_datetime(&d)))
            .unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(name) {
        return v.map(FieldValue::Text).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<serde_json::Value>, _>(name) {
        // Records are flat: nested JSON is carried as its text.
        return v.map(|j| FieldValue::Text(j.to_string())).unwrap_or_default();
    }
    FieldValue::Null
}
