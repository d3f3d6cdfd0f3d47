use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mayanetra::api::metrics::init_metrics;
use mayanetra::classifier::Detector;
use mayanetra::cli::{run_command, Cli};
use mayanetra::config::ServeMode;
use mayanetra::startup::run_startup_checks;
use mayanetra::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = cli.load_config()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if !cli.is_serve() {
        return run_command(&cli).await;
    }

    tracing::info!(
        mode = %config.server.mode,
        "Starting Mayanetra v{}",
        env!("CARGO_PKG_VERSION")
    );

    if config.auth.uses_insecure_secret() {
        tracing::warn!("SECRET_KEY is not set; using the insecure development secret");
    }

    // A missing model is not fatal: prediction endpoints answer 500 until it is installed
    let detector = match Detector::load(&config.model) {
        Ok(detector) => Some(detector),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load model artifacts");
            None
        }
    };

    // Initialize database (accounts mode only)
    let db = match config.server.mode {
        ServeMode::Accounts => Some(mayanetra::db::init(&config.server.database_path()).await?),
        ServeMode::Demo => None,
    };

    // Run startup self-checks
    if !cli.skip_checks {
        let report = run_startup_checks(&config, detector.as_ref(), db.as_ref()).await;
        if !report.all_critical_passed {
            anyhow::bail!("Startup checks failed: {}", report.summary);
        }
    } else {
        tracing::warn!("Startup checks skipped (--skip-checks)");
    }

    let metrics_handle = init_metrics()?;

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create app state
    let mut state = AppState::new(config, detector).with_metrics(metrics_handle);
    if let Some(db) = db {
        state = state.with_db(db);
    }

    let app = mayanetra::api::create_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
