// handlers/reviews.rs - /api/v1/reviews and /api/v1/bootcamps/:id/reviews

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use serde_json::{json, Value};

use super::courses::parent_bootcamp;
use super::{ensure_owner, not_found, parse_id};
use crate::api::{advanced_results, populate_all, JsonBody, ListEnvelope, Populate, ResultEnvelope};
use crate::auth::Principal;
use crate::database::models::ReviewInput;
use crate::database::{Collection, FindQuery};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::aggregates::refresh_average_rating;
use crate::state::AppState;

/// GET /api/v1/reviews
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ResultEnvelope>, ApiError> {
    let plan = state.translator.translate(&params);
    let result = advanced_results(state.store.as_ref(), Collection::Reviews, &plan, Populate::Bootcamp).await?;
    Ok(Json(result))
}

/// GET /api/v1/bootcamps/:id/reviews
pub async fn list_for_bootcamp(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<ListEnvelope>, ApiError> {
    let bootcamp_id = parse_id(&id, "Bootcamp")?;
    let query = FindQuery::new(Filter::new().eq("bootcamp", bootcamp_id.to_string()));
    let reviews = state.store.find(Collection::Reviews, &query).await?;
    Ok(Json(ListEnvelope::new(reviews)))
}

/// GET /api/v1/reviews/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let review_id = parse_id(&id, "Review")?;
    let review = state
        .store
        .find_by_id(Collection::Reviews, review_id)
        .await?
        .ok_or_else(|| not_found("Review", &id))?;
    let mut data = [review];
    populate_all(state.store.as_ref(), Populate::Bootcamp, &mut data).await?;
    let [review] = data;
    Ok(ApiResponse::success(review))
}

/// POST /api/v1/bootcamps/:id/reviews - user or admin, one review per bootcamp
pub async fn create(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(principal): Extension<Principal>,
    JsonBody(input): JsonBody<ReviewInput>,
) -> ApiResult<Value> {
    let bootcamp_id = parse_id(&id, "Bootcamp")?;
    state
        .store
        .find_by_id(Collection::Bootcamps, bootcamp_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No bootcamp with the id of {}", id)))?;
    input.validate_new()?;

    let already = Filter::new()
        .eq("bootcamp", bootcamp_id.to_string())
        .eq("user", principal.id.to_string());
    if state.store.find_one(Collection::Reviews, &already).await?.is_some() {
        return Err(ApiError::bad_request("You have already reviewed this bootcamp"));
    }

    let review = state
        .store
        .create(Collection::Reviews, input.into_document(bootcamp_id, principal.id))
        .await?;
    refresh_average_rating(state.store.as_ref(), bootcamp_id).await?;
    Ok(ApiResponse::created(review))
}

/// PUT /api/v1/reviews/:id - review owner or admin
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(principal): Extension<Principal>,
    JsonBody(input): JsonBody<ReviewInput>,
) -> ApiResult<Value> {
    input.validate_update()?;
    let review_id = parse_id(&id, "Review")?;
    let existing = state
        .store
        .find_by_id(Collection::Reviews, review_id)
        .await?
        .ok_or_else(|| not_found("Review", &id))?;
    ensure_owner(&existing, &principal, "update this review")?;

    let updated = state
        .store
        .update_by_id(Collection::Reviews, review_id, input.into_patch())
        .await?
        .ok_or_else(|| not_found("Review", &id))?;
    if let Some(bootcamp_id) = parent_bootcamp(&updated) {
        refresh_average_rating(state.store.as_ref(), bootcamp_id).await?;
    }
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/reviews/:id - review owner or admin
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Value> {
    let review_id = parse_id(&id, "Review")?;
    let existing = state
        .store
        .find_by_id(Collection::Reviews, review_id)
        .await?
        .ok_or_else(|| not_found("Review", &id))?;
    ensure_owner(&existing, &principal, "delete this review")?;

    state.store.delete_by_id(Collection::Reviews, review_id).await?;
    if let Some(bootcamp_id) = parent_bootcamp(&existing) {
        refresh_average_rating(state.store.as_ref(), bootcamp_id).await?;
    }
    Ok(ApiResponse::success(json!({})))
}
