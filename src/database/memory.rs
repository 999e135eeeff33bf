use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::store::{document_id, stamp_new, stamp_patch, Collection, DocumentStore, FindQuery};
use crate::filter::{Filter, FilterOrder};

/// In-process store used for development runs and tests. Documents keep insertion order.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: Collection, query: &FindQuery) -> Result<Vec<Value>, DatabaseError> {
        let collections = self.collections.read().await;
        let mut matched: Vec<Value> = collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| query.filter.matches(d)).cloned().collect())
            .unwrap_or_default();

        if !query.sort.is_empty() {
            matched.sort_by(|a, b| FilterOrder::compare(a, b, &query.sort));
        }

        let window = matched
            .into_iter()
            .skip(usize::try_from(query.skip).unwrap_or(usize::MAX));
        Ok(match query.limit {
            Some(limit) => window.take(usize::try_from(limit).unwrap_or(usize::MAX)).collect(),
            None => window.collect(),
        })
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, DatabaseError> {
        let collections = self.collections.read().await;
        let count = collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| document_id(d) == Some(id)))
            .cloned())
    }

    async fn create(&self, collection: Collection, doc: Map<String, Value>) -> Result<Value, DatabaseError> {
        let (id, doc) = stamp_new(doc);
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        if docs.iter().any(|d| document_id(d) == Some(id)) {
            return Err(DatabaseError::Duplicate(format!("id {}", id)));
        }
        let doc = Value::Object(doc);
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: Uuid,
        patch: Map<String, Value>,
    ) -> Result<Option<Value>, DatabaseError> {
        let patch = stamp_patch(patch);
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|d| document_id(d) == Some(id)))
        else {
            return Ok(None);
        };
        if let Value::Object(fields) = doc {
            fields.extend(patch);
        }
        Ok(Some(doc.clone()))
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, DatabaseError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(None);
        };
        Ok(docs
            .iter()
            .position(|d| document_id(d) == Some(id))
            .map(|index| docs.remove(index)))
    }

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> Result<u64, DatabaseError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !filter.matches(d));
        Ok((before - docs.len()) as u64)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
