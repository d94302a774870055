//! Convert record values to types that sqlx can bind.

use chrono::{DateTime, Utc};
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};

use crate::model::{FieldValue, RecordId};

/// A value that can be bound to a PostgreSQL query. Placeholders carry a cast to the column type,
/// so each variant reports its own wire type.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Timestamp(DateTime<Utc>),
}

impl From<&FieldValue> for PgBindValue {
    fn from(v: &FieldValue) -> Self {
        match v {
            FieldValue::Null => PgBindValue::Null,
            FieldValue::Boolean(b) => PgBindValue::Bool(*b),
            FieldValue::Integer(n) => PgBindValue::I64(*n),
            FieldValue::Decimal(f) => PgBindValue::F64(*f),
            FieldValue::Text(s) => PgBindValue::String(s.clone()),
            FieldValue::Timestamp(t) => PgBindValue::Timestamp(*t),
        }
    }
}

impl From<&RecordId> for PgBindValue {
    fn from(id: &RecordId) -> Self {
        match id {
            RecordId::Integer(n) => PgBindValue::I64(*n),
            RecordId::Text(s) => PgBindValue::String(s.clone()),
        }
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            PgBindValue::Null => <Option<String> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            PgBindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::String(s) => {
                let s_ref: &str = s.as_str();
                <&str as Encode<Postgres>>::encode_by_ref(&s_ref, buf)?
            }
            PgBindValue::Timestamp(t) => <DateTime<Utc> as Encode<Postgres>>::encode_by_ref(t, buf)?,
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            PgBindValue::Null | PgBindValue::String(_) => <String as Type<Postgres>>::type_info(),
            PgBindValue::Bool(_) => <bool as Type<Postgres>>::type_info(),
            PgBindValue::I64(_) => <i64 as Type<Postgres>>::type_info(),
            PgBindValue::F64(_) => <f64 as Type<Postgres>>::type_info(),
            PgBindValue::Timestamp(_) => <DateTime<Utc> as Type<Postgres>>::type_info(),
        })
    }
}

impl Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }
}
