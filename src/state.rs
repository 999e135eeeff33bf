use std::sync::Arc;

use crate::auth::{AuthGate, TokenIssuer};
use crate::config::AppConfig;
use crate::database::DocumentStore;
use crate::filter::QueryTranslator;
use crate::middleware::RateLimiter;
use crate::services::{Geocoder, Mailer};

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub tokens: TokenIssuer,
    pub gate: AuthGate,
    pub geocoder: Arc<dyn Geocoder>,
    pub mailer: Arc<dyn Mailer>,
    pub translator: QueryTranslator,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        geocoder: Arc<dyn Geocoder>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let tokens = TokenIssuer::from_config(&config.security);
        let gate = AuthGate::new(tokens.clone(), store.clone());
        let translator = QueryTranslator::new(&config.query);
        let limiter = Arc::new(RateLimiter::from_config(&config.api));
        Self {
            config: Arc::new(config),
            store,
            tokens,
            gate,
            geocoder,
            mailer,
            translator,
            limiter,
        }
    }
}
