//! In-process accessor backed by a lock-protected vector.

use async_trait::async_trait;
use std::sync::RwLock;

use super::{AccessorError, FieldValue, ModelAccessor, Operation, Record, RecordId};

pub struct InMemoryAccessor {
    primary_key: String,
    records: RwLock<Vec<Record>>,
}

impl InMemoryAccessor {
    pub fn new(primary_key: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            primary_key: primary_key.into(),
            records: RwLock::new(records),
        }
    }

    fn matches_id(&self, record: &Record, id: &RecordId) -> bool {
        match (record.get(&self.primary_key), id) {
            (FieldValue::Integer(n), RecordId::Integer(m)) => n == m,
            (FieldValue::Text(s), RecordId::Text(t)) => s == t,
            (FieldValue::Text(s), RecordId::Integer(m)) => s.trim() == m.to_string(),
            _ => false,
        }
    }

    fn poisoned() -> AccessorError {
        AccessorError::Fetch("record store lock poisoned".into())
    }
}

#[async_trait]
impl ModelAccessor for InMemoryAccessor {
    async fn list(&self) -> Result<Vec<Record>, AccessorError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(records.clone())
    }

    async fn get_by_id(&self, id: &RecordId) -> Result<Option<Record>, AccessorError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(records.iter().find(|r| self.matches_id(r, id)).cloned())
    }

    async fn create(&self, mut data: Record) -> Result<Record, AccessorError> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        if data.get(&self.primary_key).is_null() {
            let next = records
                .iter()
                .filter_map(|r| match r.get(&self.primary_key) {
                    FieldValue::Integer(n) => Some(*n),
                    _ => None,
                })
                .max()
                .unwrap_or(0)
                + 1;
            data.insert(self.primary_key.clone(), next);
        }
        records.push(data.clone());
        Ok(data)
    }

    async fn update(&self, id: &RecordId, mut data: Record) -> Result<Option<Record>, AccessorError> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        data.remove(&self.primary_key);
        let Some(existing) = records.iter_mut().find(|r| self.matches_id(r, id)) else {
            return Ok(None);
        };
        existing.merge(data);
        Ok(Some(existing.clone()))
    }

    async fn delete(&self, id: &RecordId) -> Result<bool, AccessorError> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        let before = records.len();
        records.retain(|r| !self.matches_id(r, id));
        Ok(records.len() != before)
    }

    fn operations(&self) -> &'static [Operation] {
        &[
            Operation::List,
            Operation::GetById,
            Operation::Create,
            Operation::Update,
            Operation::Delete,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryAccessor {
        InMemoryAccessor::new(
            "id",
            vec![
                Record::new().with("id", 1).with("name", "Amit"),
                Record::new().with("id", 2).with("name", "Bela"),
            ],
        )
    }

    #[tokio::test]
    async fn create_assigns_next_integer_id() {
        let s = store();
        let created = s.create(Record::new().with("name", "Chitra")).await.unwrap();
        assert_eq!(created.get("id"), &FieldValue::Integer(3));
        assert_eq!(s.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn update_merges_and_keeps_primary_key() {
        let s = store();
        let updated = s
            .update(&RecordId::Integer(2), Record::new().with("id", 99).with("name", "Bela K"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.get("id"), &FieldValue::Integer(2));
        assert_eq!(updated.get("name"), &FieldValue::Text("Bela K".into()));
        assert!(s.update(&RecordId::Integer(5), Record::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_and_delete_by_id() {
        let s = store();
        assert!(s.get_by_id(&RecordId::Integer(1)).await.unwrap().is_some());
        assert!(s.get_by_id(&RecordId::Text("x".into())).await.unwrap().is_none());
        assert!(s.delete(&RecordId::Integer(1)).await.unwrap());
        assert!(!s.delete(&RecordId::Integer(1)).await.unwrap());
        assert_eq!(s.list().await.unwrap().len(), 1);
    }
}
