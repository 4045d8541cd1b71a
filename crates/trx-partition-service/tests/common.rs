//! Common test utilities for trx-partition integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;

use trx_partition_service::{create_router, AppState, ServiceConfig};
use trx_partition_store::{InsertStrategy, Ledger, MemoryStore, PartitionCache, PgConfig};

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The backing in-memory store, for call counts and row assertions.
    pub store: Arc<MemoryStore>,
    /// The existence cache shared with the router.
    pub cache: PartitionCache,
}

impl TestHarness {
    /// Create a harness with both tables bootstrapped and no child partitions.
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Create a harness with a custom configuration.
    pub async fn with_config(config: ServiceConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = PartitionCache::new();
        let ledger = Ledger::new(Arc::clone(&store), cache.clone());

        ledger
            .create_base_table()
            .await
            .expect("Failed to create base table");
        ledger
            .create_parent_table()
            .await
            .expect("Failed to create parent table");

        let state = AppState::new(ledger, config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            cache,
        }
    }
}

/// Configuration suitable for tests.
pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        listen_addr: "127.0.0.1:0".into(),
        database: PgConfig::default(),
        default_strategy: InsertStrategy::PartitionedDynamicCached,
        precreate_days: 0,
        max_batch_size: 100,
        cors_origins: vec!["*".into()],
        max_body_bytes: 1024 * 1024,
        request_timeout_seconds: 30,
    }
}
