use serde_json::Value;
use sqlx::{postgres::PgArguments, types::Json, Postgres};

use crate::database::manager::DatabaseError;
use crate::database::store::{Collection, FindQuery};
use crate::filter::{Filter, FilterOrder, FilterWhere, SqlParam, SqlResult, MAX_SKIP};

/// SQL for the JSONB-per-row table layout: `(id UUID, doc JSONB, created_at TIMESTAMPTZ)`.
pub struct QueryBuilder {
    table_name: &'static str,
}

impl QueryBuilder {
    pub fn new(collection: Collection) -> Self {
        Self { table_name: collection.table_name() }
    }

    pub fn select(&self, query: &FindQuery) -> Result<SqlResult, DatabaseError> {
        let mut params = vec![];
        let where_clause = FilterWhere::generate(&query.filter, &mut params)?;
        let order_clause = FilterOrder::generate(&query.sort, &mut params);
        // LIMIT and OFFSET are bigint
        let skip = query.skip.min(MAX_SKIP);
        let limit_clause = match query.limit {
            Some(limit) => format!("LIMIT {} OFFSET {}", limit.min(MAX_SKIP), skip),
            None if skip > 0 => format!("OFFSET {}", skip),
            None => String::new(),
        };

        let query = [
            "SELECT \"doc\"".to_string(),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    pub fn count(&self, filter: &Filter) -> Result<SqlResult, DatabaseError> {
        let mut params = vec![];
        let where_clause = FilterWhere::generate(filter, &mut params)?;
        Ok(SqlResult {
            query: format!("SELECT COUNT(*) FROM \"{}\" WHERE {}", self.table_name, where_clause),
            params,
        })
    }

    pub fn delete(&self, filter: &Filter) -> Result<SqlResult, DatabaseError> {
        let mut params = vec![];
        let where_clause = FilterWhere::generate(filter, &mut params)?;
        Ok(SqlResult {
            query: format!("DELETE FROM \"{}\" WHERE {}", self.table_name, where_clause),
            params,
        })
    }

    pub fn insert(&self) -> String {
        format!(
            "INSERT INTO \"{}\" (\"id\", \"doc\") VALUES ($1, $2) RETURNING \"doc\"",
            self.table_name
        )
    }

    pub fn select_by_id(&self) -> String {
        format!("SELECT \"doc\" FROM \"{}\" WHERE \"id\" = $1", self.table_name)
    }

    pub fn update_by_id(&self) -> String {
        format!(
            "UPDATE \"{}\" SET \"doc\" = \"doc\" || $2::jsonb WHERE \"id\" = $1 RETURNING \"doc\"",
            self.table_name
        )
    }

    pub fn delete_by_id(&self) -> String {
        format!("DELETE FROM \"{}\" WHERE \"id\" = $1 RETURNING \"doc\"", self.table_name)
    }

    /// Idempotent DDL for one collection, including its unique expression indexes.
    pub fn create_table(&self) -> Vec<String> {
        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS \"{0}\" (\
             \"id\" UUID PRIMARY KEY, \
             \"doc\" JSONB NOT NULL, \
             \"created_at\" TIMESTAMPTZ NOT NULL DEFAULT now())",
            self.table_name
        )];
        let unique = match self.table_name {
            "bootcamps" => Some("(\"doc\" ->> 'name')"),
            "users" => Some("(lower(\"doc\" ->> 'email'))"),
            "reviews" => Some("((\"doc\" ->> 'bootcamp'), (\"doc\" ->> 'user'))"),
            _ => None,
        };
        if let Some(expr) = unique {
            statements.push(format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS \"{0}_unique_idx\" ON \"{0}\" ({1})",
                self.table_name, expr
            ));
        }
        statements
    }
}

pub fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, Postgres, PgArguments>,
    param: &SqlParam,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match param.clone() {
        SqlParam::Path(segments) => q.bind(segments),
        SqlParam::Json(value) => q.bind(Json(value)),
        SqlParam::Float(f) => q.bind(f),
    }
}

pub fn bind_param_query_scalar<'q, O>(
    q: sqlx::query::QueryScalar<'q, Postgres, O, PgArguments>,
    param: &SqlParam,
) -> sqlx::query::QueryScalar<'q, Postgres, O, PgArguments> {
    match param.clone() {
        SqlParam::Path(segments) => q.bind(segments),
        SqlParam::Json(value) => q.bind(Json::<Value>(value)),
        SqlParam::Float(f) => q.bind(f),
    }
}
