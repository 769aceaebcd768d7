//! # Thoughtboard server
//!
//! Loads settings, installs logging, opens the configured store and serves
//! the HTTP API until Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use api_adapters::dto::FeedLimits;
use api_adapters::metrics::Metrics;
use api_adapters::web::{build_router, AppState};
use configs::{LogFormat, Settings, StorageBackend};
use services::Ports;
use storage_adapters::{InMemoryStore, StaleViewRegistry};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings)?;

    let views = Arc::new(StaleViewRegistry::new());
    let ports = open_ports(&settings, views).await?;
    info!(backend = %settings.storage.backend, "storage ready");

    let feed = FeedLimits {
        default_page_size: settings.feed.default_page_size,
        max_page_size: settings.feed.max_page_size,
    };
    let router = build_router(AppState::new(ports, Arc::new(Metrics::new()), feed));

    let address = settings.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(%address, "thoughtboard listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("thoughtboard stopped");
    Ok(())
}

/// `RUST_LOG` wins over `log.filter`.
fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log.filter))
        .context("parsing log filter")?;

    match settings.log.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?,
    }
    Ok(())
}

async fn open_ports(settings: &Settings, views: Arc<StaleViewRegistry>) -> anyhow::Result<Ports> {
    match settings.storage.backend {
        StorageBackend::Memory => {
            warn!("memory backend selected, data is lost on exit");
            Ok(Ports::from_store(Arc::new(InMemoryStore::new()), views))
        }
        StorageBackend::Sqlite => open_sqlite(settings, views).await,
    }
}

#[cfg(feature = "db-sqlite")]
async fn open_sqlite(settings: &Settings, views: Arc<StaleViewRegistry>) -> anyhow::Result<Ports> {
    let url = settings
        .database_url()
        .context("storage.backend = sqlite requires database.url")?;
    let store = storage_adapters::SqliteStore::connect(url, settings.database.max_connections)
        .await
        .context("opening sqlite database")?;
    Ok(Ports::from_store(Arc::new(store), views))
}

#[cfg(not(feature = "db-sqlite"))]
async fn open_sqlite(
    _settings: &Settings,
    _views: Arc<StaleViewRegistry>,
) -> anyhow::Result<Ports> {
    anyhow::bail!("built without the db-sqlite feature")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C, shutting down");
        return;
    }
    info!("Ctrl-C received, draining connections");
}
