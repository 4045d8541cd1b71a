//! Application state.

use trx_partition_store::Ledger;

use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Transaction operations over the configured backend.
    pub ledger: Ledger,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(ledger: Ledger, config: ServiceConfig) -> Self {
        tracing::info!(
            default_strategy = %config.default_strategy,
            max_batch_size = config.max_batch_size,
            "Application state ready"
        );
        Self { ledger, config }
    }
}
