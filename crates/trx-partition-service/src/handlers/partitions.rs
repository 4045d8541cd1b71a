//! Child partition handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use trx_partition_core::PartitionName;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::handlers::transactions::parse_date;
use crate::state::AppState;

/// Request to ensure a day's child table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnsurePartitionRequest {
    /// The partition day (`YYYY-MM-DD`).
    pub date: NaiveDate,
}

/// Child table status.
#[derive(Debug, Serialize)]
pub struct PartitionResponse {
    /// Child table name.
    pub table: String,
    /// Partition day.
    pub date: NaiveDate,
    /// Whether the catalog reports the table.
    pub exists: bool,
    /// Whether this process has the table in its existence cache.
    pub cached: bool,
}

/// Create a day's child table if missing.
pub async fn ensure_partition(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<EnsurePartitionRequest>,
) -> Result<Json<PartitionResponse>, ApiError> {
    let name = state.ledger.create_child_table(body.date).await?;

    tracing::info!(table = %name, "Child partition ensured via API");

    Ok(Json(PartitionResponse {
        table: name.to_string(),
        date: name.date(),
        exists: true,
        cached: state.ledger.cache().is_known_existing(&name),
    }))
}

/// Probe a day's child table in the catalog.
pub async fn get_partition(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> Result<Json<PartitionResponse>, ApiError> {
    let date = parse_date(&date)?;
    let name = PartitionName::for_date(date);
    let exists = state.ledger.child_table_exists(date).await?;

    Ok(Json(PartitionResponse {
        cached: state.ledger.cache().is_known_existing(&name),
        table: name.to_string(),
        date,
        exists,
    }))
}
