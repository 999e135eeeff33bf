use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::database::models::{course::average_cost, review::average_rating};
use crate::database::{Collection, DatabaseError, DocumentStore, FindQuery};
use crate::filter::Filter;

/// Recompute and store `averageCost` from the bootcamp's course tuitions.
pub async fn refresh_average_cost(store: &dyn DocumentStore, bootcamp: Uuid) -> Result<Option<f64>, DatabaseError> {
    let tuitions = numeric_field(store, Collection::Courses, bootcamp, "tuition").await?;
    let average = average_cost(&tuitions);
    write(store, bootcamp, "averageCost", average).await?;
    Ok(average)
}

/// Recompute and store `averageRating` from the bootcamp's review ratings.
pub async fn refresh_average_rating(store: &dyn DocumentStore, bootcamp: Uuid) -> Result<Option<f64>, DatabaseError> {
    let ratings = numeric_field(store, Collection::Reviews, bootcamp, "rating").await?;
    let average = average_rating(&ratings);
    write(store, bootcamp, "averageRating", average).await?;
    Ok(average)
}

async fn numeric_field(
    store: &dyn DocumentStore,
    collection: Collection,
    bootcamp: Uuid,
    field: &str,
) -> Result<Vec<f64>, DatabaseError> {
    let query = FindQuery::new(Filter::new().eq("bootcamp", bootcamp.to_string()));
    Ok(store
        .find(collection, &query)
        .await?
        .iter()
        .filter_map(|doc| doc.get(field).and_then(Value::as_f64))
        .collect())
}

async fn write(store: &dyn DocumentStore, bootcamp: Uuid, field: &str, value: Option<f64>) -> Result<(), DatabaseError> {
    debug!("Bootcamp {} {} -> {:?}", bootcamp, field, value);
    let mut patch = Map::new();
    patch.insert(field.to_string(), json!(value));
    store.update_by_id(Collection::Bootcamps, bootcamp, patch).await?;
    Ok(())
}
