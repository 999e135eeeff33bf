// handlers/bootcamps.rs - /api/v1/bootcamps

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use serde_json::{json, Value};

use super::{ensure_owner, not_found, parse_id};
use crate::api::{advanced_results, JsonBody, ListEnvelope, Populate, ResultEnvelope};
use crate::auth::Principal;
use crate::database::models::BootcampInput;
use crate::database::{Collection, FindQuery};
use crate::error::ApiError;
use crate::filter::{Filter, Predicate};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// Earth radius in kilometres; radius search distances are in km.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// GET /api/v1/bootcamps - filtered, sorted, paginated, with `courses`
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ResultEnvelope>, ApiError> {
    let plan = state.translator.translate(&params);
    let result = advanced_results(state.store.as_ref(), Collection::Bootcamps, &plan, Populate::Courses).await?;
    Ok(Json(result))
}

/// GET /api/v1/bootcamps/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let bootcamp_id = parse_id(&id, "Bootcamp")?;
    let bootcamp = state
        .store
        .find_by_id(Collection::Bootcamps, bootcamp_id)
        .await?
        .ok_or_else(|| not_found("Bootcamp", &id))?;
    Ok(ApiResponse::success(bootcamp))
}

/// POST /api/v1/bootcamps - publisher or admin
///
/// The address is geocoded into a GeoJSON `location`. Publishers may own a
/// single bootcamp; admins are not limited.
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    JsonBody(input): JsonBody<BootcampInput>,
) -> ApiResult<Value> {
    input.validate_new()?;

    if !principal.is_admin() {
        let owned = state
            .store
            .find_one(Collection::Bootcamps, &Filter::new().eq("user", principal.id.to_string()))
            .await?;
        if owned.is_some() {
            return Err(ApiError::bad_request(format!(
                "The user with ID {} has already published a bootcamp",
                principal.id
            )));
        }
    }
    ensure_unique_name(&state, input.name.as_deref(), None).await?;

    let address = input.address.clone().unwrap_or_default();
    let location = state.geocoder.locate(&address).await?;

    let doc = input.into_document(principal.id, location.to_point());
    let bootcamp = state.store.create(Collection::Bootcamps, doc).await?;
    tracing::info!(user = %principal.id, "bootcamp created");
    Ok(ApiResponse::created(bootcamp))
}

/// PUT /api/v1/bootcamps/:id - owner or admin
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(principal): Extension<Principal>,
    JsonBody(input): JsonBody<BootcampInput>,
) -> ApiResult<Value> {
    input.validate_update()?;
    let bootcamp_id = parse_id(&id, "Bootcamp")?;
    let existing = state
        .store
        .find_by_id(Collection::Bootcamps, bootcamp_id)
        .await?
        .ok_or_else(|| not_found("Bootcamp", &id))?;
    ensure_owner(&existing, &principal, "update this bootcamp")?;
    ensure_unique_name(&state, input.name.as_deref(), Some(&id)).await?;

    let location = match input.address.as_deref() {
        Some(address) => Some(state.geocoder.locate(address).await?.to_point()),
        None => None,
    };

    let updated = state
        .store
        .update_by_id(Collection::Bootcamps, bootcamp_id, input.into_patch(location))
        .await?
        .ok_or_else(|| not_found("Bootcamp", &id))?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/bootcamps/:id - owner or admin; removes the bootcamp's courses and reviews
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Value> {
    let bootcamp_id = parse_id(&id, "Bootcamp")?;
    let existing = state
        .store
        .find_by_id(Collection::Bootcamps, bootcamp_id)
        .await?
        .ok_or_else(|| not_found("Bootcamp", &id))?;
    ensure_owner(&existing, &principal, "delete this bootcamp")?;

    let children = Filter::new().eq("bootcamp", bootcamp_id.to_string());
    let courses = state.store.delete_many(Collection::Courses, &children).await?;
    let reviews = state.store.delete_many(Collection::Reviews, &children).await?;
    state.store.delete_by_id(Collection::Bootcamps, bootcamp_id).await?;
    tracing::info!(bootcamp = %bootcamp_id, courses, reviews, "bootcamp deleted");

    Ok(ApiResponse::success(json!({})))
}

/// GET /api/v1/bootcamps/radius/:zipcode/:distance - distance in km
pub async fn within_radius(
    State(state): State<AppState>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> Result<Json<ListEnvelope>, ApiError> {
    let distance: f64 = distance
        .parse()
        .ok()
        .filter(|d: &f64| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid distance '{}'", distance)))?;

    let center = state.geocoder.locate(&zipcode).await?;
    let filter = Filter::new().and(Predicate::GeoWithin {
        field: "location".to_string(),
        center: (center.longitude, center.latitude),
        radius: distance / EARTH_RADIUS_KM,
    });
    let bootcamps = state.store.find(Collection::Bootcamps, &FindQuery::new(filter)).await?;
    Ok(Json(ListEnvelope::new(bootcamps)))
}

async fn ensure_unique_name(state: &AppState, name: Option<&str>, current_id: Option<&str>) -> Result<(), ApiError> {
    let Some(name) = name.map(str::trim) else {
        return Ok(());
    };
    let existing = state
        .store
        .find_one(Collection::Bootcamps, &Filter::new().eq("name", name))
        .await?;
    let taken_by_other = existing
        .as_ref()
        .and_then(|doc| doc.get("id"))
        .and_then(Value::as_str)
        .map(|id| Some(id) != current_id)
        .unwrap_or(false);
    if taken_by_other {
        return Err(ApiError::bad_request("Duplicate field value entered"));
    }
    Ok(())
}
