#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::{json, Map, Value};

use bootcamp_api::auth::hash_password;
use bootcamp_api::config::AppConfig;
use bootcamp_api::database::{Collection, DocumentStore, MemoryStore};
use bootcamp_api::services::{GeoLocation, MemoryMailer, StaticGeocoder};
use bootcamp_api::{app, AppState};

pub const PASSWORD: &str = "123456";

/// One server per test: its own port, store and mail outbox.
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<MemoryMailer>,
}

pub fn boston() -> GeoLocation {
    GeoLocation {
        latitude: 42.3505,
        longitude: -71.1054,
        formatted_address: "233 Bay State Rd, Boston, MA 02215, US".into(),
        street: "233 Bay State Rd".into(),
        city: "Boston".into(),
        state_code: "MA".into(),
        zipcode: "02215".into(),
        country_code: "US".into(),
    }
}

pub fn cambridge() -> GeoLocation {
    GeoLocation {
        latitude: 42.3736,
        longitude: -71.1097,
        formatted_address: "Massachusetts Ave, Cambridge, MA 02138, US".into(),
        street: "Massachusetts Ave".into(),
        city: "Cambridge".into(),
        state_code: "MA".into(),
        zipcode: "02138".into(),
        country_code: "US".into(),
    }
}

pub fn providence() -> GeoLocation {
    GeoLocation {
        latitude: 41.824,
        longitude: -71.4128,
        formatted_address: "Westminster St, Providence, RI 02903, US".into(),
        street: "Westminster St".into(),
        city: "Providence".into(),
        state_code: "RI".into(),
        zipcode: "02903".into(),
        country_code: "US".into(),
    }
}

fn geocoder() -> StaticGeocoder {
    StaticGeocoder::new()
        .with("233 Bay State Rd Boston MA 02215", boston())
        .with("02215", boston())
        .with("Massachusetts Ave Cambridge MA 02138", cambridge())
        .with("Westminster St Providence RI 02903", providence())
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(AppConfig::development(), MemoryMailer::new()).await
    }

    pub async fn spawn_with(config: AppConfig, mailer: MemoryMailer) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(mailer);
        let state = AppState::new(config, store.clone(), Arc::new(geocoder()), mailer.clone());

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        let router = app(state).into_make_service_with_connect_info::<SocketAddr>();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("test server stopped: {}", e);
            }
        });

        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            client,
            store,
            mailer,
        })
    }

    pub async fn send(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut req = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        let status = res.status();
        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PUT, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, path, token, None).await
    }

    /// Register through the API and return the issued token.
    pub async fn register(&self, name: &str, email: &str, role: &str) -> Result<String> {
        let (status, body) = self
            .post(
                "/api/v1/auth/register",
                None,
                json!({ "name": name, "email": email, "password": PASSWORD, "role": role }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "register failed: {} {}", status, body);
        token_of(&body)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(StatusCode, Value)> {
        self.post("/api/v1/auth/login", None, json!({ "email": email, "password": password }))
            .await
    }

    /// Admins cannot self-register; insert one directly and log in.
    pub async fn admin(&self) -> Result<String> {
        let mut doc = Map::new();
        doc.insert("name".into(), json!("Admin"));
        doc.insert("email".into(), json!("admin@example.com"));
        doc.insert("role".into(), json!("admin"));
        doc.insert("password".into(), json!(hash_password(PASSWORD)?));
        self.store.create(Collection::Users, doc).await?;

        let (status, body) = self.login("admin@example.com", PASSWORD).await?;
        anyhow::ensure!(status == StatusCode::OK, "admin login failed: {}", body);
        token_of(&body)
    }

    pub async fn me(&self, token: &str) -> Result<Value> {
        let (status, body) = self.get("/api/v1/auth/me", Some(token)).await?;
        anyhow::ensure!(status == StatusCode::OK, "me failed: {}", body);
        Ok(body["data"].clone())
    }

    pub async fn create_bootcamp(&self, token: &str, body: Value) -> Result<Value> {
        let (status, body) = self.post("/api/v1/bootcamps", Some(token), body).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create bootcamp failed: {} {}", status, body);
        Ok(body["data"].clone())
    }
}

pub fn token_of(body: &Value) -> Result<String> {
    body["token"]
        .as_str()
        .map(str::to_string)
        .context("response without token")
}

pub fn id_of(doc: &Value) -> String {
    doc["id"].as_str().unwrap_or_default().to_string()
}

pub fn bootcamp_body(name: &str, address: &str, careers: &[&str]) -> Value {
    json!({
        "name": name,
        "description": format!("{} teaches full stack development", name),
        "website": "https://example.com",
        "phone": "(111) 111-1111",
        "email": "enroll@example.com",
        "address": address,
        "careers": careers,
        "housing": true,
        "jobAssistance": true,
    })
}

pub fn course_body(title: &str, tuition: f64) -> Value {
    json!({
        "title": title,
        "description": "Learn the fundamentals",
        "weeks": "8",
        "tuition": tuition,
        "minimumSkill": "beginner",
        "scholarshipsAvailable": false,
    })
}

pub fn review_body(title: &str, rating: u32) -> Value {
    json!({ "title": title, "text": "Great experience overall", "rating": rating })
}
