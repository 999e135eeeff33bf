// handlers/courses.rs - /api/v1/courses and /api/v1/bootcamps/:id/courses

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{ensure_owner, not_found, parse_id};
use crate::api::{advanced_results, populate_all, JsonBody, ListEnvelope, Populate, ResultEnvelope};
use crate::auth::Principal;
use crate::database::models::CourseInput;
use crate::database::{document_id, Collection, FindQuery};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::aggregates::refresh_average_cost;
use crate::state::AppState;

/// GET /api/v1/courses - advanced results with the bootcamp summary
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ResultEnvelope>, ApiError> {
    let plan = state.translator.translate(&params);
    let result = advanced_results(state.store.as_ref(), Collection::Courses, &plan, Populate::Bootcamp).await?;
    Ok(Json(result))
}

/// GET /api/v1/bootcamps/:id/courses
pub async fn list_for_bootcamp(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<ListEnvelope>, ApiError> {
    let bootcamp_id = parse_id(&id, "Bootcamp")?;
    let query = FindQuery::new(Filter::new().eq("bootcamp", bootcamp_id.to_string()));
    let courses = state.store.find(Collection::Courses, &query).await?;
    Ok(Json(ListEnvelope::new(courses)))
}

/// GET /api/v1/courses/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let course_id = parse_id(&id, "Course")?;
    let course = state
        .store
        .find_by_id(Collection::Courses, course_id)
        .await?
        .ok_or_else(|| not_found("Course", &id))?;
    let mut data = [course];
    populate_all(state.store.as_ref(), Populate::Bootcamp, &mut data).await?;
    let [course] = data;
    Ok(ApiResponse::success(course))
}

/// POST /api/v1/bootcamps/:id/courses - publisher or admin, bootcamp owner
pub async fn create(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(principal): Extension<Principal>,
    JsonBody(input): JsonBody<CourseInput>,
) -> ApiResult<Value> {
    let bootcamp_id = parse_id(&id, "Bootcamp")?;
    let bootcamp = state
        .store
        .find_by_id(Collection::Bootcamps, bootcamp_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No bootcamp with the id of {}", id)))?;
    ensure_owner(&bootcamp, &principal, &format!("add a course to bootcamp {}", bootcamp_id))?;
    input.validate_new()?;

    let course = state
        .store
        .create(Collection::Courses, input.into_document(bootcamp_id, principal.id))
        .await?;
    refresh_average_cost(state.store.as_ref(), bootcamp_id).await?;
    Ok(ApiResponse::created(course))
}

/// PUT /api/v1/courses/:id - publisher or admin, course owner
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(principal): Extension<Principal>,
    JsonBody(input): JsonBody<CourseInput>,
) -> ApiResult<Value> {
    input.validate_update()?;
    let course_id = parse_id(&id, "Course")?;
    let existing = state
        .store
        .find_by_id(Collection::Courses, course_id)
        .await?
        .ok_or_else(|| not_found("Course", &id))?;
    ensure_owner(&existing, &principal, &format!("update course {}", course_id))?;

    let updated = state
        .store
        .update_by_id(Collection::Courses, course_id, input.into_patch())
        .await?
        .ok_or_else(|| not_found("Course", &id))?;
    if let Some(bootcamp_id) = parent_bootcamp(&updated) {
        refresh_average_cost(state.store.as_ref(), bootcamp_id).await?;
    }
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/courses/:id - publisher or admin, course owner
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Value> {
    let course_id = parse_id(&id, "Course")?;
    let existing = state
        .store
        .find_by_id(Collection::Courses, course_id)
        .await?
        .ok_or_else(|| not_found("Course", &id))?;
    ensure_owner(&existing, &principal, &format!("delete course {}", course_id))?;

    state.store.delete_by_id(Collection::Courses, course_id).await?;
    if let Some(bootcamp_id) = parent_bootcamp(&existing) {
        refresh_average_cost(state.store.as_ref(), bootcamp_id).await?;
    }
    Ok(ApiResponse::success(json!({})))
}

/// `bootcamp` reference of a course or review document.
pub(crate) fn parent_bootcamp(doc: &Value) -> Option<Uuid> {
    doc.get("bootcamp").and_then(|b| match b {
        Value::String(s) => Uuid::parse_str(s).ok(),
        populated => document_id(populated),
    })
}
