use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use bootcamp_api::config::AppConfig;
use bootcamp_api::database::{DatabaseManager, DocumentStore, MemoryStore, PgStore};
use bootcamp_api::services::{mailer, Geocoder, MapQuestGeocoder, StaticGeocoder};
use bootcamp_api::{app, AppState};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StoreKind {
    Memory,
    Postgres,
}

/// Bootcamp directory REST API server
#[derive(Debug, Parser)]
#[command(name = "bootcamp-api", version, about)]
struct Args {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Document store backend
    #[arg(long, env = "STORE", value_enum, default_value = "memory")]
    store: StoreKind,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL, JWT_SECRET etc. are visible to clap and config
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")))
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env();
    config.validate().context("invalid configuration")?;
    tracing::info!("Starting bootcamp API in {:?} mode", config.environment);

    let store: Arc<dyn DocumentStore> = match args.store {
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
        StoreKind::Postgres => {
            let pool = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to postgres")?;
            let store = PgStore::new(pool);
            store.migrate().await.context("failed to prepare tables")?;
            Arc::new(store)
        }
    };

    let geocoder: Arc<dyn Geocoder> = match MapQuestGeocoder::new(&config.geocoder) {
        Ok(geocoder) => Arc::new(geocoder),
        Err(_) => {
            tracing::warn!("GEOCODER_API_KEY not set; addresses will not resolve");
            Arc::new(StaticGeocoder::new())
        }
    };
    let mailer = mailer::from_config(&config.mail);

    let state = AppState::new(config, store, geocoder, mailer);
    let router = app(state);

    let bind_addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
