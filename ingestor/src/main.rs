use anyhow::Context;
use axum::{routing::get, Router};
use ingestor::config::Config;
use ingestor::retention::RetentionScheduler;
use ingestor::rest::{self, AppState};
use ingestor::store::{ReadingStore, StoreOptions};
use ingestor::{db, metrics, schema, shutdown};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // A missing .env file is normal
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(config).await {
        error!("Ingestor failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    config.validate().context("invalid configuration")?;

    info!("Starting sensor ingestor");
    info!("HTTP server: {}", config.server.http_addr);
    info!(
        "Database: {}",
        config.database.url.split('@').last().unwrap_or("***")
    );

    if let Err(e) = metrics::init_metrics() {
        warn!("Failed to register metrics: {}", e);
    }

    let pool = db::make_pool(&config.database)
        .await
        .context("failed to connect to database")?;
    schema::initialize(&pool)
        .await
        .context("failed to initialize schema")?;

    let store = ReadingStore::new(
        pool.clone(),
        StoreOptions {
            retention_enabled: config.retention.enabled,
            cleanup_pause: config.retention.pause,
            sql_logging: config.logging.enable_sql_logging,
        },
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let retention_handle = if config.retention.enabled {
        let scheduler = Arc::new(RetentionScheduler::new(
            store.clone(),
            config.retention.clone(),
        )?);
        info!(
            "Data retention enabled: {} days, schedule {:?}",
            config.retention.retention_days, config.retention.schedule
        );
        Some(tokio::spawn(scheduler.run(shutdown_rx.clone())))
    } else {
        info!("Data retention disabled");
        None
    };

    // Build HTTP app with REST API and metrics endpoint
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(rest::create_router(AppState {
            store,
            api: config.api,
            retention: config.retention.clone(),
            show_error_details: config.server.show_error_details,
        }));

    let listener = tokio::net::TcpListener::bind(&config.server.http_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.server.http_addr))?;
    info!("HTTP server listening on {}", config.server.http_addr);

    let mut server_shutdown = shutdown_rx.clone();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.wait_for(|stop| *stop).await;
            })
            .await
    });

    shutdown::signal()
        .context("failed to install signal handlers")?
        .await
        .context("failed to listen for shutdown signal")?;
    let _ = shutdown_tx.send(true);

    let deadline = config.server.shutdown_timeout;
    match tokio::time::timeout(deadline, server_handle).await {
        Ok(Ok(Ok(()))) => info!("HTTP server stopped"),
        Ok(Ok(Err(e))) => error!("HTTP server error: {}", e),
        Ok(Err(e)) => error!("HTTP server task failed: {}", e),
        Err(_) => warn!("HTTP server did not stop within {:?}", deadline),
    }
    if let Some(handle) = retention_handle {
        if tokio::time::timeout(deadline, handle).await.is_err() {
            warn!("Retention run did not finish within {:?}", deadline);
        }
    }

    db::close_pool(&pool, deadline).await;
    info!("Shutting down");
    Ok(())
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
