// handlers/auth.rs - /api/v1/auth
//
// Token acquisition is public (register, login, forgot/reset password); the
// remaining endpoints run behind `protect`.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::users::ensure_email_free;
use crate::api::JsonBody;
use crate::auth::token::{hash_reset_token, issue_reset_token, match_reset_token};
use crate::auth::{hash_password, verify_password, Principal, Role};
use crate::database::models::user::{normalize_email, password_hash, public_view, MIN_PASSWORD_LEN};
use crate::database::models::{RegisterInput, UserInput};
use crate::database::{document_id, Collection};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::Email;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DetailsInput {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeInput {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordInput {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordInput {
    pub password: Option<String>,
}

/// POST /api/v1/auth/register
pub async fn register(State(state): State<AppState>, JsonBody(input): JsonBody<RegisterInput>) -> Result<Response, ApiError> {
    input.validate()?;
    ensure_email_free(&state, input.email.as_deref(), None).await?;

    let hash = hash_password(input.password.as_deref().unwrap_or_default())?;
    let user = state
        .store
        .create(Collection::Users, input.into_input().into_document(hash))
        .await?;
    tracing::info!(user = ?document_id(&user), "user registered");
    send_token_response(&state, &user, StatusCode::OK)
}

/// POST /api/v1/auth/login
pub async fn login(State(state): State<AppState>, JsonBody(input): JsonBody<LoginInput>) -> Result<Response, ApiError> {
    let (Some(email), Some(password)) = (input.email, input.password) else {
        return Err(ApiError::bad_request("Please provide an email and password"));
    };

    let user = state
        .store
        .find_one(Collection::Users, &Filter::new().eq("email", normalize_email(&email)))
        .await?;
    let Some(user) = user else {
        tracing::debug!("login for unknown email");
        return Err(ApiError::unauthorized("Invalid credentials"));
    };
    if !password_hash(&user).map(|hash| verify_password(&password, hash)).unwrap_or(false) {
        tracing::debug!(user = ?document_id(&user), "login with wrong password");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }
    send_token_response(&state, &user, StatusCode::OK)
}

/// GET /api/v1/auth/logout - overwrite the token cookie with a short-lived placeholder
pub async fn logout(State(state): State<AppState>) -> Response {
    let cookie = token_cookie("none", 10, state.config.security.secure_cookies);
    (
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true, "data": {} })),
    )
        .into_response()
}

/// GET /api/v1/auth/me
pub async fn me(State(state): State<AppState>, Extension(principal): Extension<Principal>) -> ApiResult<Value> {
    let user = current_user(&state, principal.id).await?;
    Ok(ApiResponse::success(public_view(&user)))
}

/// PUT /api/v1/auth/updatedetails - name and email only
pub async fn update_details(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    JsonBody(input): JsonBody<DetailsInput>,
) -> ApiResult<Value> {
    let input = UserInput {
        name: input.name,
        email: input.email,
        password: None,
        role: None,
    };
    input.validate_update()?;
    let own_id = principal.id.to_string();
    ensure_email_free(&state, input.email.as_deref(), Some(&own_id)).await?;

    let user = state
        .store
        .update_by_id(Collection::Users, principal.id, input.into_patch(None))
        .await?
        .ok_or_else(|| ApiError::unauthorized(crate::auth::gate::NOT_AUTHORIZED))?;
    Ok(ApiResponse::success(public_view(&user)))
}

/// PUT /api/v1/auth/updatepassword
pub async fn update_password(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    JsonBody(input): JsonBody<PasswordChangeInput>,
) -> Result<Response, ApiError> {
    let (Some(current), Some(new_password)) = (input.current_password, input.new_password) else {
        return Err(ApiError::bad_request("Please provide the current and new password"));
    };
    let user = current_user(&state, principal.id).await?;
    if !password_hash(&user).map(|hash| verify_password(&current, hash)).unwrap_or(false) {
        return Err(ApiError::unauthorized("Password is incorrect"));
    }
    check_password_length(&new_password)?;

    let user = set_password(&state, principal.id, &new_password, Map::new()).await?;
    send_token_response(&state, &user, StatusCode::OK)
}

/// POST /api/v1/auth/forgotpassword
///
/// Stores the hashed reset token and mails the plain one. When the mail cannot be
/// sent the stored token is discarded again.
pub async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(input): JsonBody<ForgotPasswordInput>,
) -> ApiResult<Value> {
    let email = input.email.map(|e| normalize_email(&e)).unwrap_or_default();
    let user = state
        .store
        .find_one(Collection::Users, &Filter::new().eq("email", email.as_str()))
        .await?
        .ok_or_else(|| ApiError::not_found("There is no user with that email"))?;
    let user_id = document_id(&user).ok_or_else(|| ApiError::internal_server_error("User document without id"))?;

    let reset = issue_reset_token();
    let mut patch = Map::new();
    patch.insert("resetPasswordToken".into(), json!(reset.hashed));
    patch.insert("resetPasswordExpire".into(), json!(reset.expires_at.to_rfc3339()));
    state.store.update_by_id(Collection::Users, user_id, patch).await?;

    let reset_url = format!("{}/api/v1/auth/resetpassword/{}", request_origin(&headers), reset.plain);
    let message = Email {
        to: email,
        subject: "Password reset token".to_string(),
        text: format!(
            "You are receiving this email because you (or someone else) has requested the reset of a password. \
             Please make a PUT request to: \n\n {}",
            reset_url
        ),
    };

    if let Err(e) = state.mailer.send(message).await {
        tracing::error!(user = %user_id, "reset email failed: {}", e);
        let mut clear = Map::new();
        clear.insert("resetPasswordToken".into(), Value::Null);
        clear.insert("resetPasswordExpire".into(), Value::Null);
        state.store.update_by_id(Collection::Users, user_id, clear).await?;
        return Err(ApiError::internal_server_error("Email could not be sent"));
    }

    Ok(ApiResponse::success(json!("Email sent")))
}

/// PUT /api/v1/auth/resetpassword/:resettoken
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    JsonBody(input): JsonBody<ResetPasswordInput>,
) -> Result<Response, ApiError> {
    let hashed = hash_reset_token(&token);
    let user = state
        .store
        .find_one(Collection::Users, &Filter::new().eq("resetPasswordToken", hashed.as_str()))
        .await?;

    let valid = user.as_ref().and_then(|u| {
        let expires = u.get("resetPasswordExpire")?.as_str()?;
        let expires: DateTime<Utc> = DateTime::parse_from_rfc3339(expires).ok()?.with_timezone(&Utc);
        let id = document_id(u)?;
        match_reset_token(&token, &hashed, expires).then_some(id)
    });
    let Some(user_id) = valid else {
        return Err(ApiError::bad_request("Invalid token"));
    };

    let password = input.password.unwrap_or_default();
    check_password_length(&password)?;

    let mut clear = Map::new();
    clear.insert("resetPasswordToken".into(), Value::Null);
    clear.insert("resetPasswordExpire".into(), Value::Null);
    let user = set_password(&state, user_id, &password, clear).await?;
    send_token_response(&state, &user, StatusCode::OK)
}

async fn current_user(state: &AppState, id: Uuid) -> Result<Value, ApiError> {
    state
        .store
        .find_by_id(Collection::Users, id)
        .await?
        .ok_or_else(|| ApiError::unauthorized(crate::auth::gate::NOT_AUTHORIZED))
}

async fn set_password(state: &AppState, id: Uuid, password: &str, mut patch: Map<String, Value>) -> Result<Value, ApiError> {
    patch.insert("password".into(), json!(hash_password(password)?));
    state
        .store
        .update_by_id(Collection::Users, id, patch)
        .await?
        .ok_or_else(|| ApiError::unauthorized(crate::auth::gate::NOT_AUTHORIZED))
}

fn check_password_length(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        let mut fields = std::collections::HashMap::new();
        fields.insert("password".to_string(), "Password must be at least 6 characters".to_string());
        return Err(ApiError::validation_error("Password must be at least 6 characters", Some(fields)));
    }
    Ok(())
}

/// `{success, token}` plus an HttpOnly `token` cookie.
fn send_token_response(state: &AppState, user: &Value, status: StatusCode) -> Result<Response, ApiError> {
    let id = document_id(user).ok_or_else(|| ApiError::internal_server_error("User document without id"))?;
    let role = user
        .get("role")
        .and_then(Value::as_str)
        .and_then(Role::parse)
        .unwrap_or(Role::User);
    let name = user.get("name").and_then(Value::as_str).unwrap_or_default();
    let token = state.tokens.issue(id, role, name)?;

    let security = &state.config.security;
    let max_age = security.cookie_expire_days.saturating_mul(24 * 60 * 60);
    let cookie = token_cookie(&token, max_age, security.secure_cookies);

    Ok((
        status,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true, "token": token })),
    )
        .into_response())
}

fn token_cookie(value: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!("token={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax", value, max_age_secs);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `scheme://host` of the incoming request, honouring `X-Forwarded-Proto`.
fn request_origin(headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{}://{}", scheme, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_flags() {
        assert_eq!(token_cookie("abc", 60, false), "token=abc; Path=/; Max-Age=60; HttpOnly; SameSite=Lax");
        assert!(token_cookie("abc", 60, true).ends_with("; Secure"));
    }

    #[test]
    fn origin_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("api.example.com"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(request_origin(&headers), "https://api.example.com");
        assert_eq!(request_origin(&HeaderMap::new()), "http://localhost");
    }
}
