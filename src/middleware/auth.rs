use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::{gate::NOT_AUTHORIZED, Principal, Role};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticate the bearer token and attach the stored `Principal` to the request.
pub async fn protect(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let principal = state.gate.authenticate(request.headers()).await?;
    tracing::debug!(user = %principal.id, role = %principal.role, "authenticated");
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Roles admitted by an [`authorize`] layer.
#[derive(Debug, Clone, Copy)]
pub struct AllowedRoles(pub &'static [Role]);

/// Reject principals whose role is not allowed. Must run inside [`protect`].
pub async fn authorize(
    State(AllowedRoles(roles)): State<AllowedRoles>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .ok_or_else(|| ApiError::unauthorized(NOT_AUTHORIZED))?;
    if let Err(e) = crate::auth::authorize(principal, roles) {
        tracing::warn!(user = %principal.id, "{}", e);
        return Err(e.into());
    }
    Ok(next.run(request).await)
}
