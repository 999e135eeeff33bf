use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::database::{Collection, DatabaseError, DocumentStore, FindQuery};
use crate::filter::{lookup, Filter, FilterOp, Pagination, Predicate, QueryPlan};

/// Related documents attached to each result after the page is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Populate {
    None,
    /// Bootcamp → every course whose `bootcamp` is its id, as `courses`.
    Courses,
    /// Course or review → `bootcamp` replaced by `{id, name, description}`.
    Bootcamp,
}

/// Paginated listing body.
#[derive(Debug, Clone, Serialize)]
pub struct ResultEnvelope {
    pub success: bool,
    pub count: usize,
    pub pagination: Pagination,
    pub data: Vec<Value>,
}

impl ResultEnvelope {
    pub fn map_data(mut self, f: impl Fn(&Value) -> Value) -> Self {
        self.data = self.data.iter().map(f).collect();
        self
    }
}

/// Plain `{success, count, data}` listing used by nested and radius routes.
#[derive(Debug, Clone, Serialize)]
pub struct ListEnvelope {
    pub success: bool,
    pub count: usize,
    pub data: Vec<Value>,
}

impl ListEnvelope {
    pub fn new(data: Vec<Value>) -> Self {
        Self { success: true, count: data.len(), data }
    }
}

/// Count, fetch, project and populate one page of `collection` for `plan`.
pub async fn advanced_results(
    store: &dyn DocumentStore,
    collection: Collection,
    plan: &QueryPlan,
    populate: Populate,
) -> Result<ResultEnvelope, DatabaseError> {
    let total = store.count(collection, &plan.filter).await?;
    let query = FindQuery::new(plan.filter.clone())
        .sort(plan.sort_keys.clone())
        .skip(plan.skip())
        .limit(plan.limit);
    let mut data = store.find(collection, &query).await?;
    debug!(
        collection = collection.table_name(),
        total,
        returned = data.len(),
        "advanced results"
    );

    if let Some(fields) = &plan.selected_fields {
        data = data.iter().map(|doc| project(doc, fields)).collect();
    }

    populate_all(store, populate, &mut data).await?;

    Ok(ResultEnvelope {
        success: true,
        count: data.len(),
        pagination: plan.pagination(total),
        data,
    })
}

pub async fn populate_all(store: &dyn DocumentStore, populate: Populate, data: &mut [Value]) -> Result<(), DatabaseError> {
    match populate {
        Populate::None => Ok(()),
        Populate::Courses => populate_courses(store, data).await,
        Populate::Bootcamp => populate_bootcamp(store, data).await,
    }
}

/// Keep only `fields` (dotted paths allowed) plus `id`.
pub fn project(doc: &Value, fields: &[String]) -> Value {
    let mut out = Map::new();
    if let Some(id) = doc.get("id") {
        out.insert("id".to_string(), id.clone());
    }
    for field in fields {
        if let Some(value) = lookup(doc, field) {
            insert_path(&mut out, field, value.clone());
        }
    }
    Value::Object(out)
}

fn insert_path(out: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            out.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = out
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(child) = child {
                insert_path(child, rest, value);
            }
        }
    }
}

fn ids_of(data: &[Value], field: &str) -> Vec<Value> {
    let mut ids: Vec<Value> = data.iter().filter_map(|d| d.get(field).filter(|v| v.is_string()).cloned()).collect();
    ids.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
    ids.dedup();
    ids
}

async fn populate_courses(store: &dyn DocumentStore, data: &mut [Value]) -> Result<(), DatabaseError> {
    let ids = ids_of(data, "id");
    let filter = Filter::new().and(Predicate::In("bootcamp".to_string(), ids));
    let courses = store.find(Collection::Courses, &FindQuery::new(filter)).await?;

    let mut by_bootcamp: HashMap<&str, Vec<Value>> = HashMap::new();
    for course in &courses {
        if let Some(bootcamp) = course.get("bootcamp").and_then(Value::as_str) {
            by_bootcamp.entry(bootcamp).or_default().push(course.clone());
        }
    }

    for doc in data.iter_mut() {
        let related = doc
            .get("id")
            .and_then(Value::as_str)
            .and_then(|id| by_bootcamp.get(id))
            .cloned()
            .unwrap_or_default();
        if let Value::Object(fields) = doc {
            fields.insert("courses".to_string(), Value::Array(related));
        }
    }
    Ok(())
}

async fn populate_bootcamp(store: &dyn DocumentStore, data: &mut [Value]) -> Result<(), DatabaseError> {
    let ids = ids_of(data, "bootcamp");
    if ids.is_empty() {
        return Ok(());
    }
    let filter = Filter::new().and(Predicate::new("id", FilterOp::In, Value::Array(ids)));
    let bootcamps = store.find(Collection::Bootcamps, &FindQuery::new(filter)).await?;
    let summaries: HashMap<String, Value> = bootcamps
        .iter()
        .filter_map(|b| {
            let id = b.get("id")?.as_str()?.to_string();
            Some((id, project(b, &["name".to_string(), "description".to_string()])))
        })
        .collect();

    for doc in data.iter_mut() {
        let summary = doc
            .get("bootcamp")
            .and_then(Value::as_str)
            .and_then(|id| summaries.get(id))
            .cloned();
        if let (Some(summary), Value::Object(fields)) = (summary, doc) {
            fields.insert("bootcamp".to_string(), summary);
        }
    }
    Ok(())
}
