use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{types::Json, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use super::manager::DatabaseError;
use super::query_builder::{bind_param_query, bind_param_query_scalar, QueryBuilder};
use super::store::{stamp_new, stamp_patch, Collection, DocumentStore, FindQuery};
use crate::filter::Filter;

/// Document store backed by one JSONB table per collection.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the collection tables and unique indexes when missing.
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        for collection in Collection::ALL {
            for statement in QueryBuilder::new(collection).create_table() {
                sqlx::query(&statement).execute(&self.pool).await?;
            }
        }
        info!("Document tables ready");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn find(&self, collection: Collection, query: &FindQuery) -> Result<Vec<Value>, DatabaseError> {
        let sql = QueryBuilder::new(collection).select(query)?;
        debug!(sql = %sql.query, "find");
        let mut q = sqlx::query_scalar::<_, Json<Value>>(&sql.query);
        for param in &sql.params {
            q = bind_param_query_scalar(q, param);
        }
        let rows = q.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|Json(doc)| doc).collect())
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, DatabaseError> {
        let sql = QueryBuilder::new(collection).count(filter)?;
        let mut q = sqlx::query_scalar::<_, i64>(&sql.query);
        for param in &sql.params {
            q = bind_param_query_scalar(q, param);
        }
        let count = q.fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, DatabaseError> {
        let row = sqlx::query_scalar::<_, Json<Value>>(&QueryBuilder::new(collection).select_by_id())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(doc)| doc))
    }

    async fn create(&self, collection: Collection, doc: Map<String, Value>) -> Result<Value, DatabaseError> {
        let (id, doc) = stamp_new(doc);
        let Json(created) = sqlx::query_scalar::<_, Json<Value>>(&QueryBuilder::new(collection).insert())
            .bind(id)
            .bind(Json(Value::Object(doc)))
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: Uuid,
        patch: Map<String, Value>,
    ) -> Result<Option<Value>, DatabaseError> {
        let patch = stamp_patch(patch);
        let row = sqlx::query_scalar::<_, Json<Value>>(&QueryBuilder::new(collection).update_by_id())
            .bind(id)
            .bind(Json(Value::Object(patch)))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(doc)| doc))
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, DatabaseError> {
        let row = sqlx::query_scalar::<_, Json<Value>>(&QueryBuilder::new(collection).delete_by_id())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(doc)| doc))
    }

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> Result<u64, DatabaseError> {
        let sql = QueryBuilder::new(collection).delete(filter)?;
        let mut q = sqlx::query(&sql.query);
        for param in &sql.params {
            q = bind_param_query(q, param);
        }
        let result = q.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
