use std::sync::Arc;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::token::TokenIssuer;
use crate::database::{Collection, DatabaseError, DocumentStore};

pub const NOT_AUTHORIZED: &str = "Not authorized to access this route";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Publisher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "publisher" => Some(Role::Publisher),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated caller, as currently stored. Read-only once attached to a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Principal {
    pub id: uuid::Uuid,
    pub role: Role,
    pub name: String,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl AuthError {
    fn unauthorized() -> Self {
        AuthError::Unauthorized(NOT_AUTHORIZED.to_string())
    }
}

/// Resolves bearer credentials to a freshly loaded principal and checks roles.
#[derive(Clone)]
pub struct AuthGate {
    tokens: TokenIssuer,
    store: Arc<dyn DocumentStore>,
}

impl AuthGate {
    pub fn new(tokens: TokenIssuer, store: Arc<dyn DocumentStore>) -> Self {
        Self { tokens, store }
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let token = extract_bearer(headers).map_err(|reason| {
            debug!("Rejected request: {}", reason);
            AuthError::unauthorized()
        })?;

        let claims = self.tokens.verify(token).map_err(|e| {
            warn!("Rejected bearer token: {}", e);
            AuthError::unauthorized()
        })?;

        // Role and name come from the stored user, never from the token.
        let user = self
            .store
            .find_by_id(Collection::Users, claims.id)
            .await?
            .ok_or_else(|| {
                warn!("Token subject {} no longer exists", claims.id);
                AuthError::unauthorized()
            })?;

        let role = user
            .get("role")
            .and_then(|r| r.as_str())
            .and_then(Role::parse)
            .unwrap_or(Role::User);
        let name = user.get("name").and_then(|n| n.as_str()).unwrap_or_default().to_string();

        Ok(Principal { id: claims.id, role, name })
    }

    pub fn authorize(&self, principal: &Principal, allowed: &[Role]) -> Result<(), AuthError> {
        authorize(principal, allowed)
    }
}

pub fn authorize(principal: &Principal, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.contains(&principal.role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden(format!(
            "User role '{}' is not authorized to access this route",
            principal.role
        )))
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, &'static str> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or("missing Authorization header")?;
    let value = header.to_str().map_err(|_| "invalid Authorization header encoding")?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or("Authorization header must use Bearer scheme")?
        .trim();
    if token.is_empty() {
        return Err("empty bearer token");
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use axum::http::HeaderValue;
    use chrono::Duration;
    use serde_json::json;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    async fn gate_with_user(role: &str) -> (AuthGate, uuid::Uuid) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create(
                Collection::Users,
                json!({ "name": "Stored Name", "role": role }).as_object().cloned().unwrap(),
            )
            .await
            .unwrap();
        let id = crate::database::document_id(&user).unwrap();
        let tokens = TokenIssuer::new("gate-secret", Duration::hours(1));
        (AuthGate::new(tokens, store), id)
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer(&headers("Bearer abc")), Ok("abc"));
        assert!(extract_bearer(&headers("Basic abc")).is_err());
        assert!(extract_bearer(&headers("Bearer   ")).is_err());
        assert!(extract_bearer(&HeaderMap::new()).is_err());
    }

    #[tokio::test]
    async fn principal_comes_from_store_not_token() {
        let (gate, id) = gate_with_user("publisher").await;
        let token = gate.tokens.issue(id, Role::Admin, "Token Name").unwrap();
        let principal = gate.authenticate(&headers(&format!("Bearer {}", token))).await.unwrap();
        assert_eq!(principal.role, Role::Publisher);
        assert_eq!(principal.name, "Stored Name");
    }

    #[tokio::test]
    async fn unknown_subject_is_unauthorized() {
        let (gate, _) = gate_with_user("user").await;
        let token = gate.tokens.issue(uuid::Uuid::new_v4(), Role::User, "Ghost").unwrap();
        let err = gate.authenticate(&headers(&format!("Bearer {}", token))).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized(_)));
    }

    #[test]
    fn wrong_role_is_forbidden() {
        let principal = Principal { id: uuid::Uuid::new_v4(), role: Role::User, name: "u".into() };
        assert!(authorize(&principal, &[Role::User, Role::Admin]).is_ok());
        let err = authorize(&principal, &[Role::Publisher, Role::Admin]).unwrap_err();
        assert_eq!(err.to_string(), "User role 'user' is not authorized to access this route");
    }
}
