//! SIREN Server - Main entry point

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use siren_common::logging::{init_logging, LogConfig};
use siren_common::SirenError;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing::info;

use siren_server::config::Config;
use siren_server::routes::{router, AppState};
use siren_server::scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("siren-server".to_string())
        .filter_directives("siren_server=debug,tower_http=debug,sqlx=info".to_string())
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);
    init_logging(&log_config)?;

    info!("Starting SIREN Server");

    // Load configuration
    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    // Fail fast when the export directory cannot be created
    std::fs::create_dir_all(&config.pipeline.export_dir).map_err(|e| {
        SirenError::config(format!(
            "export directory '{}' is not usable: {}",
            config.pipeline.export_dir, e
        ))
    })?;

    // Source (operational) store pool
    let source = MySqlPoolOptions::new()
        .max_connections(config.source_database.max_connections)
        .acquire_timeout(Duration::from_secs(config.source_database.connect_timeout_secs))
        .connect(&config.source_database.url)
        .await?;
    info!("Source store connection pool established");

    // Destination (analytical) store pool
    let dest = PgPoolOptions::new()
        .max_connections(config.destination_database.max_connections)
        .acquire_timeout(Duration::from_secs(
            config.destination_database.connect_timeout_secs,
        ))
        .connect(&config.destination_database.url)
        .await?;
    info!("Destination store connection pool established");

    let state = AppState {
        source,
        dest,
        config: Arc::new(config.clone()),
    };

    // Start the partition-and-report scheduler if enabled
    let _scheduler_handle = if config.pipeline.schedule_enabled {
        info!("Scheduler is enabled");
        Some(scheduler::start(state.clone()))
    } else {
        info!("Scheduler is disabled (SIREN_SCHEDULE_ENABLED=false)");
        None
    };

    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to install shutdown signal handler: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
