//! Creditkitd
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use creditkit::database::MemoryDatabase;
use creditkit::webhook::WebhookIngestor;
use creditkit::Lifecycle;
use creditkitd::cli::CLIArgs;
use creditkitd::config::Settings;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let default_filter = "debug";
    let hyper_filter = "hyper=warn";

    let env_filter = EnvFilter::new(format!("{default_filter},{hyper_filter}"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = CLIArgs::parse();
    let settings = Settings::new(args.config).from_env();

    if settings.firma_plus.webhook_secret.is_empty() {
        bail!("Webhook secret must be set");
    }

    let localstore = Arc::new(MemoryDatabase::new());
    let lifecycle = Arc::new(Lifecycle::new(localstore));
    let ingestor = Arc::new(WebhookIngestor::new(
        Arc::clone(&lifecycle),
        settings.firma_plus.webhook_secret.clone(),
    ));

    let router = creditkit_axum::create_webhook_router(ingestor);

    let listen_addr = format!(
        "{}:{}",
        settings.info.listen_host, settings.info.listen_port
    );
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!("Webhook server listening on {}", listen_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Could not listen for shutdown signal: {}", err);
    }
    tracing::info!("Shutdown signal received");
}
