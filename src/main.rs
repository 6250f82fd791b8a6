mod bot;
mod config;
mod llm;
mod platform;
mod prompts;
mod server;
#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::server::{AppState, ServiceFactory, TelegramServices};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,nutribot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Provider: {}", config.llm.provider);
    info!("  Model: {}", config.llm.model);
    info!("  Listen address: {}", config.server.listen_addr);

    let services: Arc<dyn ServiceFactory> = Arc::new(TelegramServices);
    register_with_telegram(&config, services.as_ref()).await;

    let listen_addr = config.server.listen_addr.clone();
    let app = server::router(Arc::new(AppState::new(config, services)));

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {listen_addr}"))?;

    info!("Webhook server listening on {}", listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Webhook server stopped");
    Ok(())
}

/// Publish the command menu and, when configured, point Telegram at our webhook.
/// Failures are logged; the server still starts.
async fn register_with_telegram(config: &Config, services: &dyn ServiceFactory) {
    let transport = services.transport(config);

    match transport.register_commands(&bot::COMMANDS).await {
        Ok(()) => info!("Registered {} bot commands", bot::COMMANDS.len()),
        Err(e) => warn!("Could not register bot commands: {:#}", e),
    }

    if let Some(url) = &config.server.webhook_url {
        match transport.set_webhook(url).await {
            Ok(()) => info!("Webhook set to {}", url),
            Err(e) => warn!("Could not set webhook: {:#}", e),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingTransport, StubCompletion, StubServices};

    #[tokio::test]
    async fn test_startup_registers_commands_and_webhook() {
        let transport = RecordingTransport::new();
        let services = StubServices {
            completion: StubCompletion::failing(),
            transport: transport.clone(),
        };
        let mut config = Config::default();
        config.server.webhook_url = Some("https://bot.example.test/".to_string());

        register_with_telegram(&config, &services).await;

        let commands = transport.commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].command, "start");
        assert_eq!(commands[1].command, "recipe");
        assert_eq!(commands[1].description, "Полезный рецепт 🥙");
        assert_eq!(transport.webhooks(), vec!["https://bot.example.test/".to_string()]);
    }

    #[tokio::test]
    async fn test_startup_skips_webhook_when_unset() {
        let transport = RecordingTransport::new();
        let services = StubServices {
            completion: StubCompletion::failing(),
            transport: transport.clone(),
        };

        register_with_telegram(&Config::default(), &services).await;

        assert_eq!(transport.commands().len(), 2);
        assert!(transport.webhooks().is_empty());
    }
}
