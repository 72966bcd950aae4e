mod books;
mod bootstrap;
mod chat;
mod health;
mod notify;
mod reserve;

use anyhow::Result;
use bookdesk_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use bookdesk_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;

    tracing::info!(
        event_name = "system.server.channels_configured",
        llm_key_configured = app.config.llm.api_key.is_some(),
        email_configured = app.config.email.api_key.is_some(),
        webhook_configured = app.config.webhook.url.is_some(),
        "outbound channel configuration"
    );

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        book_count = app.catalog.len(),
        "bookdesk-server listening"
    );

    let grace_secs = app.config.server.graceful_shutdown_secs;
    axum::serve(listener, app.router())
        .with_graceful_shutdown(async move {
            wait_for_shutdown().await;
            tracing::info!(
                event_name = "system.server.stopping",
                grace_secs,
                "shutdown signal received, draining connections"
            );
        })
        .await?;

    tracing::info!(event_name = "system.server.stopped", "bookdesk-server stopped");
    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            error = %error,
            "failed to listen for shutdown signal"
        );
    }
}
