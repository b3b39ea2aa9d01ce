//! status-server - Main entry point
//!
//! Loads configuration, opens the database, starts the prompt/summary
//! scheduler and serves the HTTP API until Ctrl+C or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use status_common::api::load_token_secret;
use status_common::config::Settings;
use status_common::db::init_database;
use status_server::services::{OpenAiSummarizer, Scheduler};
use status_server::{build_router, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for status-server
#[derive(Parser, Debug)]
#[command(name = "status-server")]
#[command(about = "Weekly team status reporting service")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "STATUS_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file (overrides config)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:8000 (overrides config)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "status_server=info,status_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting status-server v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(database) = args.database {
        settings.database_path = database;
    }
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }

    info!("Database path: {}", settings.database_path.display());
    let pool = init_database(&settings.database_path)
        .await
        .context("Failed to initialize database")?;

    let token_secret = if settings.auth.secret_key.is_empty() {
        let secret = load_token_secret(&pool)
            .await
            .context("Failed to load token secret")?;
        info!("Using token secret stored in database");
        secret
    } else {
        settings.auth.secret_key.clone()
    };

    if settings.ai.api_key.is_empty() {
        warn!("No AI API key configured; summary generation will fail until one is set");
    }
    let summarizer = Arc::new(OpenAiSummarizer::new(&settings.ai).context("Failed to create summarizer")?);

    let bind_addr = settings.bind_addr.clone();
    let scheduler_settings = settings.scheduler.clone();
    let state = AppState::new(pool.clone(), settings, token_secret, summarizer)
        .context("Failed to build application state")?;

    if scheduler_settings.enabled {
        let scheduler = Scheduler::new(
            pool,
            state.summaries.clone(),
            state.login_limiter.clone(),
            Duration::from_secs(scheduler_settings.poll_interval_secs),
        );
        tokio::spawn(scheduler.run());
    } else {
        info!("Scheduler disabled by configuration");
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    info!("status-server listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
