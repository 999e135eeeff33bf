use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::manager::DatabaseError;
use crate::filter::{Filter, SortKey};

/// Document collections served by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Bootcamps,
    Courses,
    Reviews,
    Users,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Bootcamps,
        Collection::Courses,
        Collection::Reviews,
        Collection::Users,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            Collection::Bootcamps => "bootcamps",
            Collection::Courses => "courses",
            Collection::Reviews => "reviews",
            Collection::Users => "users",
        }
    }
}

/// Filtered, sorted, windowed read over one collection.
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    pub filter: Filter,
    pub sort: Vec<SortKey>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindQuery {
    pub fn new(filter: Filter) -> Self {
        Self { filter, ..Default::default() }
    }

    pub fn sort(mut self, sort: Vec<SortKey>) -> Self {
        self.sort = sort;
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Schemaless JSON document store. Documents are JSON objects carrying a string `id`
/// plus `createdAt`/`updatedAt` timestamps maintained by the store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: Collection, query: &FindQuery) -> Result<Vec<Value>, DatabaseError>;

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, DatabaseError>;

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, DatabaseError>;

    async fn create(&self, collection: Collection, doc: Map<String, Value>) -> Result<Value, DatabaseError>;

    /// Shallow-merge `patch` into the document and return the updated document.
    async fn update_by_id(
        &self,
        collection: Collection,
        id: Uuid,
        patch: Map<String, Value>,
    ) -> Result<Option<Value>, DatabaseError>;

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, DatabaseError>;

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> Result<u64, DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Value>, DatabaseError> {
        let query = FindQuery::new(filter.clone()).limit(1);
        Ok(self.find(collection, &query).await?.into_iter().next())
    }
}

pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Assign identity and timestamps to a document about to be inserted.
pub fn stamp_new(mut doc: Map<String, Value>) -> (Uuid, Map<String, Value>) {
    let id = doc
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    let now = timestamp_now();
    doc.insert("id".to_string(), Value::String(id.to_string()));
    doc.entry("createdAt").or_insert_with(|| Value::String(now.clone()));
    doc.insert("updatedAt".to_string(), Value::String(now));
    (id, doc)
}

/// Strip fields the caller may not change and stamp `updatedAt`.
pub fn stamp_patch(mut patch: Map<String, Value>) -> Map<String, Value> {
    patch.remove("id");
    patch.remove("createdAt");
    patch.insert("updatedAt".to_string(), Value::String(timestamp_now()));
    patch
}

pub fn document_id(doc: &Value) -> Option<Uuid> {
    doc.get("id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
}
