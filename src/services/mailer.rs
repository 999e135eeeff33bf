use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Posts messages to a JSON mail API with a bearer key.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: impl Into<String>, config: &MailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: config.api_key.clone(),
            from: format!("{} <{}>", config.from_name, config.from_email),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let mut request = self.client.post(&self.api_url).json(&json!({
            "from": self.from,
            "to": email.to,
            "subject": email.subject,
            "text": email.text,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!("Mail API request failed: {}", e);
                MailError::Transport(e.to_string())
            })?;
        Ok(())
    }
}

/// Writes messages to the log instead of delivering them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "{}", email.text);
        Ok(())
    }
}

/// Captures sent messages; can be switched to fail every send.
#[derive(Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<Email>>,
    failing: bool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { outbox: Mutex::default(), failing: true }
    }

    pub async fn sent(&self) -> Vec<Email> {
        self.outbox.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if self.failing {
            return Err(MailError::Transport("mail transport disabled".to_string()));
        }
        self.outbox.lock().await.push(email);
        Ok(())
    }
}

/// Pick the HTTP transport when a mail API is configured, otherwise log messages.
pub fn from_config(config: &MailConfig) -> Arc<dyn Mailer> {
    match &config.api_url {
        Some(url) => Arc::new(HttpMailer::new(url.clone(), config)),
        None => Arc::new(LogMailer),
    }
}
