mod common;

use anyhow::Result;
use bootcamp_api::config::AppConfig;
use bootcamp_api::services::MemoryMailer;
use common::{token_of, TestServer, PASSWORD};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn register_returns_token_and_cookie() -> Result<()> {
    let server = TestServer::spawn().await?;
    let res = server
        .client
        .post(format!("{}/api/v1/auth/register", server.base_url))
        .json(&json!({ "name": "Jane", "email": "Jane@Example.com", "password": PASSWORD, "role": "publisher" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("token="), "{cookie}");
    assert!(cookie.contains("HttpOnly"));

    let body: serde_json::Value = res.json().await?;
    assert_eq!(body["success"], true);
    let token = token_of(&body)?;

    let me = server.me(&token).await?;
    assert_eq!(me["email"], "jane@example.com");
    assert_eq!(me["role"], "publisher");
    assert!(me.get("password").is_none());
    Ok(())
}

#[tokio::test]
async fn register_rejects_admin_role_and_duplicates() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (status, body) = server
        .post(
            "/api/v1/auth/register",
            None,
            json!({ "name": "Eve", "email": "eve@example.com", "password": PASSWORD, "role": "admin" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    server.register("Jane", "jane@example.com", "user").await?;
    let (status, body) = server
        .post(
            "/api/v1/auth/register",
            None,
            json!({ "name": "Jane Again", "email": "JANE@example.com", "password": PASSWORD }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Duplicate field value entered");
    Ok(())
}

#[tokio::test]
async fn register_validates_fields() -> Result<()> {
    let server = TestServer::spawn().await?;
    let (status, body) = server
        .post("/api/v1/auth/register", None, json!({ "name": "Jo", "email": "not-an-email", "password": "123" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["field_errors"]["email"].is_string(), "{body}");
    assert!(body["field_errors"]["password"].is_string(), "{body}");
    Ok(())
}

#[tokio::test]
async fn login_checks_credentials() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.register("Jane", "jane@example.com", "user").await?;

    let (status, body) = server.login("jane@example.com", PASSWORD).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(token_of(&body).is_ok());

    let (status, body) = server.login("jane@example.com", "wrong-password").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, _) = server.login("nobody@example.com", PASSWORD).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = server.post("/api/v1/auth/login", None, json!({ "email": "jane@example.com" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please provide an email and password");
    Ok(())
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = server.get("/api/v1/auth/me", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Not authorized to access this route");

    let (status, _) = server.get("/api/v1/auth/me", Some("not.a.token")).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .get(format!("{}/api/v1/auth/me", server.base_url))
        .header("Authorization", "Basic abc")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn deleted_user_token_is_rejected() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin().await?;
    let token = server.register("Jane", "jane@example.com", "user").await?;
    let me = server.me(&token).await?;

    let (status, _) = server.delete(&format!("/api/v1/users/{}", common::id_of(&me)), Some(&admin)).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server.get("/api/v1/auth/me", Some(&token)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn update_details_and_password() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.register("Jane", "jane@example.com", "user").await?;

    let (status, body) = server
        .put("/api/v1/auth/updatedetails", Some(&token), json!({ "name": "Jane Doe", "email": "doe@example.com" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Jane Doe");
    assert_eq!(body["data"]["email"], "doe@example.com");

    let (status, body) = server
        .put(
            "/api/v1/auth/updatepassword",
            Some(&token),
            json!({ "currentPassword": "wrong1", "newPassword": "abcdef" }),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Password is incorrect");

    let (status, body) = server
        .put(
            "/api/v1/auth/updatepassword",
            Some(&token),
            json!({ "currentPassword": PASSWORD, "newPassword": "abcdef" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(token_of(&body).is_ok());

    let (status, _) = server.login("doe@example.com", "abcdef").await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server.login("doe@example.com", PASSWORD).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn forgot_and_reset_password() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.register("Jane", "jane@example.com", "user").await?;

    let (status, body) = server
        .post("/api/v1/auth/forgotpassword", None, json!({ "email": "nobody@example.com" }))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "There is no user with that email");

    let (status, body) = server
        .post("/api/v1/auth/forgotpassword", None, json!({ "email": "jane@example.com" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "Email sent");

    let sent = server.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "jane@example.com");
    let reset_token = sent[0].text.trim().rsplit('/').next().unwrap_or_default().to_string();
    assert_eq!(reset_token.len(), 40, "{}", sent[0].text);

    let (status, body) = server
        .put("/api/v1/auth/resetpassword/0000", None, json!({ "password": "newpass" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid token");

    let (status, body) = server
        .put(&format!("/api/v1/auth/resetpassword/{}", reset_token), None, json!({ "password": "newpass" }))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(token_of(&body).is_ok());

    let (status, _) = server.login("jane@example.com", "newpass").await?;
    assert_eq!(status, StatusCode::OK);

    // Single use
    let (status, _) = server
        .put(&format!("/api/v1/auth/resetpassword/{}", reset_token), None, json!({ "password": "other1" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn failed_reset_mail_discards_token() -> Result<()> {
    let server = TestServer::spawn_with(AppConfig::development(), MemoryMailer::failing()).await?;
    let token = server.register("Jane", "jane@example.com", "user").await?;

    let (status, body) = server
        .post("/api/v1/auth/forgotpassword", None, json!({ "email": "jane@example.com" }))
        .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Email could not be sent");

    let me = server.me(&token).await?;
    assert!(me.get("resetPasswordToken").is_none());

    use bootcamp_api::database::{Collection, DocumentStore};
    let id = uuid::Uuid::parse_str(&common::id_of(&me))?;
    let stored = server.store.find_by_id(Collection::Users, id).await?.unwrap_or_default();
    assert!(stored["resetPasswordToken"].is_null());
    assert!(stored["resetPasswordExpire"].is_null());
    Ok(())
}

#[tokio::test]
async fn logout_expires_cookie() -> Result<()> {
    let server = TestServer::spawn().await?;
    let res = server.client.get(format!("{}/api/v1/auth/logout", server.base_url)).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("token=none"), "{cookie}");
    assert!(cookie.contains("Max-Age=10"));
    Ok(())
}
