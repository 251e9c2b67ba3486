//! moodtunes-server - main entry point
//!
//! Accepts mood-tagged song uploads and answers mood queries over HTTP.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use moodtunes_common::config::{load_toml, resolve_config_path, CONFIG_ENV_VAR};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use moodtunes_server::config::{Args, ServerConfig, TomlConfig};
use moodtunes_server::services::{ImageKitStore, ScriptExtractor, StagingArea, UploadPipeline};
use moodtunes_server::{build_router, db, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing init so the file can set the log level
    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR)?;
    let file_config: TomlConfig = match &config_path {
        Some((path, _)) => load_toml(path)?,
        None => TomlConfig::default(),
    };
    let config = ServerConfig::resolve(&args, file_config)?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting moodtunes-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &config_path {
        Some((path, source)) => {
            info!("Loaded configuration from {} ({:?})", path.display(), source)
        }
        None => warn!("No config file found, using built-in defaults"),
    }

    // Staging directory
    let staging = StagingArea::new(&config.staging_dir);
    staging
        .ensure_exists()
        .await
        .with_context(|| format!("Failed to create staging dir {}", config.staging_dir.display()))?;
    info!("Staging dir: {}", staging.dir().display());

    // Database
    let db_pool = db::init_database_pool(&config.database_url)
        .await
        .context("Failed to open database")?;
    info!("Database: {}", config.database_url);

    // Feature extractor
    let extractor = ScriptExtractor::new(
        config.extractor.program.clone(),
        config.extractor.args.clone(),
        config.extractor.timeout,
    );
    if extractor.is_available().await {
        info!(program = %extractor.program(), "Feature extractor available");
    } else {
        warn!(
            program = %extractor.program(),
            "Feature extractor not found; uploads will fail until it is installed"
        );
    }

    // Media store
    let store = ImageKitStore::new(
        config.storage.credentials.clone(),
        config.storage.folder.clone(),
        config.storage.timeout,
    )
    .context("Failed to build media store client")?
    .with_endpoints(
        config.storage.upload_url.clone(),
        config.storage.api_base_url.clone(),
    );
    info!(folder = %store.folder(), "Media store configured");

    let pipeline = UploadPipeline::new(
        staging,
        Arc::new(extractor),
        Arc::new(store),
        db_pool.clone(),
    );

    let state = AppState::new(db_pool, pipeline).with_max_upload_bytes(config.max_upload_bytes);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("Listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
