use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tracing::warn;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// Prune expired windows once the table grows past this many clients.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter keyed by client address.
#[derive(Debug)]
pub struct RateLimiter {
    enabled: bool,
    trust_forwarded_for: bool,
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(enabled: bool, max_requests: u32, window: Duration) -> Self {
        Self {
            enabled,
            trust_forwarded_for: false,
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(
            config.enable_rate_limiting,
            config.rate_limit_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        )
        .trusting_forwarded_for(config.trust_forwarded_for)
    }

    pub fn trusting_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one request; `false` once the client exceeded its window.
    pub async fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now()).await
    }

    pub async fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock().await;
        if windows.len() > PRUNE_THRESHOLD {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window { started: now, count: 0 });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window { started: now, count: 0 };
        }
        entry.count += 1;
        entry.count <= self.max_requests
    }
}

/// Peer address, then `unknown`. The first `X-Forwarded-For` hop wins
/// only when `trust_forwarded_for` is set; clients can forge the header.
pub fn client_key(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(hop) = forwarded {
            return hop.to_string();
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    if state.limiter.is_enabled() {
        let key = client_key(&request, state.limiter.trust_forwarded_for);
        if !state.limiter.check(&key).await {
            warn!("Rate limit exceeded for {}", key);
            return Err(ApiError::too_many_requests("Too many requests, please try again later"));
        }
    }
    Ok(next.run(request).await)
}
