use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rentr::config::Config;
use rentr::AppState;

#[derive(Parser, Debug)]
#[command(name = "rentr")]
#[command(author, version, about = "A fast, lightweight property-rental booking platform", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "rentr.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;

    // CLI flag wins over the config file
    init_tracing(cli.log_level.as_deref().unwrap_or(&config.logging.level));

    tracing::info!("Starting Rentr v{}", env!("CARGO_PKG_VERSION"));

    rentr::utils::ensure_dir(&config.server.data_dir)?;
    rentr::utils::ensure_dir(&config.server.data_dir.join("uploads"))?;

    let db = rentr::db::init(&config.server.data_dir).await?;

    let metrics_handle = rentr::api::metrics::init_metrics();

    if !config.email.is_configured() {
        tracing::warn!("SMTP is not configured; outgoing email is disabled");
    }
    if !config.payment.is_configured() {
        tracing::warn!("Payment gateway is not configured; only manual transfers are available");
    }

    let state = Arc::new(AppState::new(config.clone(), db).with_metrics(metrics_handle));
    let app = rentr::api::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("API server listening on http://{}", addr);
    tracing::info!("Cron secret: {}", config.cron.secret);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
