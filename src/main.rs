use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use campdir::config::redact_url;
use campdir::{
    AppConfig, AppState, DocumentStore, GeoResolver, MemoryStore, SqlDocumentStore, build_geocoder,
    build_router,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("campdir={},tower_http=debug", config.log_level))),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(errors) = config.validate() {
        for error in &errors {
            tracing::error!("{error}");
        }
        bail!("invalid configuration ({} problems)", errors.len());
    }

    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            let shown = redact_url(url);
            tracing::info!(url = %shown, "Using SQL document store");
            Arc::new(
                SqlDocumentStore::connect(url)
                    .await
                    .with_context(|| format!("connecting to {shown}"))?,
            )
        }
        None => {
            tracing::info!("Using in-memory document store");
            Arc::new(MemoryStore::new())
        }
    };

    let geocoder = build_geocoder(&config.geocoder())?;
    let geo = GeoResolver::new(geocoder, config.geo());
    let state = AppState::new(store, config.query(), geo);
    let app = build_router(&state)?;

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(
        addr = %addr,
        geocoder = ?config.geocoder,
        distance_unit = ?config.distance_unit,
        "campdir listening; docs at /docs"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received, stopping server...");
            }
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
