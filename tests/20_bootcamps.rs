mod common;

use anyhow::Result;
use common::{bootcamp_body, course_body, id_of, review_body, TestServer};
use reqwest::StatusCode;
use serde_json::json;

const BOSTON: &str = "233 Bay State Rd Boston MA 02215";
const CAMBRIDGE: &str = "Massachusetts Ave Cambridge MA 02138";
const PROVIDENCE: &str = "Westminster St Providence RI 02903";

#[tokio::test]
async fn publisher_creates_geocoded_bootcamp() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.register("Pub", "pub@example.com", "publisher").await?;
    let me = server.me(&token).await?;

    let bootcamp = server
        .create_bootcamp(&token, bootcamp_body("Devworks Bootcamp", BOSTON, &["Web Development", "UI/UX"]))
        .await?;
    assert_eq!(bootcamp["slug"], "devworks-bootcamp");
    assert_eq!(bootcamp["user"], me["id"]);
    assert_eq!(bootcamp["location"]["type"], "Point");
    assert_eq!(bootcamp["location"]["coordinates"], json!([-71.1054, 42.3505]));
    assert_eq!(bootcamp["location"]["city"], "Boston");
    assert_eq!(bootcamp["photo"], "no-photo.jpg");
    assert!(bootcamp.get("address").is_none());

    let (status, body) = server.get(&format!("/api/v1/bootcamps/{}", id_of(&bootcamp)), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Devworks Bootcamp");
    Ok(())
}

#[tokio::test]
async fn bootcamp_write_rules() -> Result<()> {
    let server = TestServer::spawn().await?;
    let user = server.register("User", "user@example.com", "user").await?;
    let publisher = server.register("Pub", "pub@example.com", "publisher").await?;

    let (status, body) = server
        .post("/api/v1/bootcamps", None, bootcamp_body("Anon", BOSTON, &["Business"]))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");

    let (status, body) = server
        .post("/api/v1/bootcamps", Some(&user), bootcamp_body("Nope", BOSTON, &["Business"]))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "User role 'user' is not authorized to access this route");

    let (status, body) = server
        .post("/api/v1/bootcamps", Some(&publisher), json!({ "name": "Incomplete" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["description"].is_string(), "{body}");

    let (status, _) = server
        .post("/api/v1/bootcamps", Some(&publisher), bootcamp_body("Bad Career", BOSTON, &["Cooking"]))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .post("/api/v1/bootcamps", Some(&publisher), bootcamp_body("Nowhere", "1 Unknown Rd", &["Business"]))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    server
        .create_bootcamp(&publisher, bootcamp_body("First", BOSTON, &["Business"]))
        .await?;
    let (status, body) = server
        .post("/api/v1/bootcamps", Some(&publisher), bootcamp_body("Second", BOSTON, &["Business"]))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap_or_default().contains("has already published a bootcamp"));
    Ok(())
}

#[tokio::test]
async fn bootcamp_names_are_unique() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin().await?;
    server.create_bootcamp(&admin, bootcamp_body("Same", BOSTON, &["Other"])).await?;

    let (status, body) = server
        .post("/api/v1/bootcamps", Some(&admin), bootcamp_body("Same", CAMBRIDGE, &["Other"]))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Duplicate field value entered");
    Ok(())
}

#[tokio::test]
async fn only_owner_or_admin_may_modify() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin().await?;
    let owner = server.register("Owner", "owner@example.com", "publisher").await?;
    let other = server.register("Other", "other@example.com", "publisher").await?;
    let other_id = id_of(&server.me(&other).await?);

    let bootcamp = server.create_bootcamp(&owner, bootcamp_body("Owned", BOSTON, &["Business"])).await?;
    let path = format!("/api/v1/bootcamps/{}", id_of(&bootcamp));

    let (status, body) = server.put(&path, Some(&other), json!({ "name": "Stolen" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], format!("User {} is not authorized to update this bootcamp", other_id));

    let (status, body) = server.put(&path, Some(&owner), json!({ "name": "Owned Renamed", "address": CAMBRIDGE })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["slug"], "owned-renamed");
    assert_eq!(body["data"]["location"]["city"], "Cambridge");

    let (status, body) = server.put(&path, Some(&admin), json!({ "housing": false })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["housing"], false);
    assert_eq!(body["data"]["name"], "Owned Renamed");

    let (status, _) = server.delete(&path, Some(&other)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn missing_and_malformed_ids_are_not_found() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = server.get("/api/v1/bootcamps/not-an-id", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Bootcamp not found with id of not-an-id");

    let missing = uuid::Uuid::new_v4();
    let (status, body) = server.get(&format!("/api/v1/bootcamps/{}", missing), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = server.get("/api/v1/nothing-here", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn radius_search_in_km() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.admin().await?;
    server.create_bootcamp(&admin, bootcamp_body("Boston Camp", BOSTON, &["Business"])).await?;
    server.create_bootcamp(&admin, bootcamp_body("Cambridge Camp", CAMBRIDGE, &["Business"])).await?;
    server.create_bootcamp(&admin, bootcamp_body("Providence Camp", PROVIDENCE, &["Business"])).await?;

    let (status, body) = server.get("/api/v1/bootcamps/radius/02215/10", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    let mut names: Vec<&str> = body["data"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|b| b["name"].as_str())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Boston Camp", "Cambridge Camp"]);

    let (_, body) = server.get("/api/v1/bootcamps/radius/02215/100", None).await?;
    assert_eq!(body["count"], 3);

    let (status, _) = server.get("/api/v1/bootcamps/radius/02215/far", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.get("/api/v1/bootcamps/radius/99999/10", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn deleting_bootcamp_removes_courses_and_reviews() -> Result<()> {
    let server = TestServer::spawn().await?;
    let publisher = server.register("Pub", "pub@example.com", "publisher").await?;
    let reviewer = server.register("Rev", "rev@example.com", "user").await?;

    let bootcamp = server.create_bootcamp(&publisher, bootcamp_body("Doomed", BOSTON, &["Business"])).await?;
    let id = id_of(&bootcamp);

    let (status, _) = server
        .post(&format!("/api/v1/bootcamps/{}/courses", id), Some(&publisher), course_body("Course", 1000.0))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = server
        .post(&format!("/api/v1/bootcamps/{}/reviews", id), Some(&reviewer), review_body("Nice", 8))
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = server.delete(&format!("/api/v1/bootcamps/{}", id), Some(&publisher)).await?;
    assert_eq!(status, StatusCode::OK);

    let (_, courses) = server.get("/api/v1/courses", None).await?;
    assert_eq!(courses["count"], 0);
    let (_, reviews) = server.get("/api/v1/reviews", None).await?;
    assert_eq!(reviews["count"], 0);
    let (status, _) = server.get(&format!("/api/v1/bootcamps/{}", id), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
