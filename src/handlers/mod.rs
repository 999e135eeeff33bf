// handlers/mod.rs - Resource handlers mounted under /api/v1
//
// Each module owns one resource. Access control is attached per route in
// routes.rs; handlers only enforce document ownership.

use serde_json::Value;
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::ApiError;

pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod health;
pub mod reviews;
pub mod users;

/// Parse a path id; malformed ids are reported like missing documents.
pub(crate) fn parse_id(raw: &str, resource: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| not_found(resource, raw))
}

pub(crate) fn not_found(resource: &str, id: &str) -> ApiError {
    ApiError::not_found(format!("{} not found with id of {}", resource, id))
}

/// Admins may act on anything; everyone else only on documents whose `user` is theirs.
pub(crate) fn ensure_owner(doc: &Value, principal: &Principal, action: &str) -> Result<(), ApiError> {
    let owner = doc.get("user").and_then(Value::as_str);
    if principal.is_admin() || owner == Some(principal.id.to_string().as_str()) {
        return Ok(());
    }
    tracing::warn!(user = %principal.id, "ownership check failed: {}", action);
    Err(ApiError::forbidden(format!(
        "User {} is not authorized to {}",
        principal.id, action
    )))
}
