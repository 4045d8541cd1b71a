//! Transaction partition service - HTTP API over day-partitioned PostgreSQL tables.
//!
//! This is the main entry point for the service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trx_partition_service::{create_router, AppState, ServiceConfig};
use trx_partition_store::{Ledger, PartitionCache, PgStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,trx_partition=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting transaction partition service");

    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        default_strategy = %config.default_strategy,
        precreate_days = config.precreate_days,
        db_max_connections = config.database.max_connections,
        "Service configuration loaded"
    );

    let store = Arc::new(PgStore::connect(&config.database).await?);
    store.ping().await?;

    // One cache for the process lifetime, shared by every request.
    let ledger = Ledger::new(store, PartitionCache::new());

    // Schema bootstrap runs before serving so handlers can assume both tables.
    ledger.create_base_table().await?;
    ledger.create_parent_table().await?;
    ledger
        .ensure_upcoming_partitions(chrono::Utc::now().date_naive(), config.precreate_days)
        .await?;

    let state = AppState::new(ledger, config.clone());
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
