// handlers/users.rs - /api/v1/users (admin only)

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde_json::{json, Value};

use super::{not_found, parse_id};
use crate::api::{advanced_results, JsonBody, Populate, ResultEnvelope};
use crate::auth::hash_password;
use crate::database::models::user::{normalize_email, public_view};
use crate::database::models::UserInput;
use crate::database::Collection;
use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/v1/users
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ResultEnvelope>, ApiError> {
    let plan = state.translator.translate(&params);
    let result = advanced_results(state.store.as_ref(), Collection::Users, &plan, Populate::None).await?;
    Ok(Json(result.map_data(public_view)))
}

/// GET /api/v1/users/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let user_id = parse_id(&id, "User")?;
    let user = state
        .store
        .find_by_id(Collection::Users, user_id)
        .await?
        .ok_or_else(|| not_found("User", &id))?;
    Ok(ApiResponse::success(public_view(&user)))
}

/// POST /api/v1/users
pub async fn create(State(state): State<AppState>, JsonBody(input): JsonBody<UserInput>) -> ApiResult<Value> {
    input.validate_new()?;
    ensure_email_free(&state, input.email.as_deref(), None).await?;

    let hash = hash_password(input.password.as_deref().unwrap_or_default())?;
    let user = state.store.create(Collection::Users, input.into_document(hash)).await?;
    Ok(ApiResponse::created(public_view(&user)))
}

/// PUT /api/v1/users/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<UserInput>,
) -> ApiResult<Value> {
    input.validate_update()?;
    let user_id = parse_id(&id, "User")?;
    ensure_email_free(&state, input.email.as_deref(), Some(&id)).await?;

    let hash = input.password.as_deref().map(hash_password).transpose()?;
    let user = state
        .store
        .update_by_id(Collection::Users, user_id, input.into_patch(hash))
        .await?
        .ok_or_else(|| not_found("User", &id))?;
    Ok(ApiResponse::success(public_view(&user)))
}

/// DELETE /api/v1/users/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    let user_id = parse_id(&id, "User")?;
    state
        .store
        .delete_by_id(Collection::Users, user_id)
        .await?
        .ok_or_else(|| not_found("User", &id))?;
    Ok(ApiResponse::success(json!({})))
}

/// Emails are unique ignoring case; `current_id` may keep its own address.
pub(crate) async fn ensure_email_free(state: &AppState, email: Option<&str>, current_id: Option<&str>) -> Result<(), ApiError> {
    let Some(email) = email else {
        return Ok(());
    };
    let existing = state
        .store
        .find_one(Collection::Users, &Filter::new().eq("email", normalize_email(email)))
        .await?;
    let taken = existing
        .as_ref()
        .and_then(|doc| doc.get("id"))
        .and_then(Value::as_str)
        .map(|id| Some(id) != current_id)
        .unwrap_or(false);
    if taken {
        return Err(ApiError::bad_request("Duplicate field value entered"));
    }
    Ok(())
}
