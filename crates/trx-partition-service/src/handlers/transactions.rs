//! Transaction write and fetch handlers.
//!
//! The write endpoints generate `n` sample transactions for one day and write
//! them one at a time, stopping at the first failure. They exist to drive and
//! compare the insert strategies under load.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use trx_partition_core::{Transaction, TransactionId};
use trx_partition_store::InsertStrategy;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

/// Batch write request for the partitioned table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartitionedBatchRequest {
    /// Number of transactions to generate.
    pub n: usize,
    /// User the transactions belong to.
    pub user_id: String,
    /// Event time; its UTC day is the partition key.
    pub date: DateTime<Utc>,
    /// Write path to use (defaults to the configured strategy).
    #[serde(default)]
    pub strategy: Option<InsertStrategy>,
}

/// Batch write request for the flat table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnpartitionedBatchRequest {
    /// Number of transactions to generate.
    pub n: usize,
    /// User the transactions belong to.
    pub user_id: String,
    /// Event time.
    pub date: DateTime<Utc>,
}

/// A written or fetched transaction.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: String,
    /// User ID.
    pub user_id: String,
    /// Free-form payload.
    pub info: String,
    /// Status.
    pub status: String,
    /// Partition key (`YYYY-MM-DD`).
    pub trx_date: NaiveDate,
    /// Event time (RFC 3339).
    pub trx_timestamp: String,
}

impl From<&Transaction> for TransactionResponse {
    fn from(trx: &Transaction) -> Self {
        Self {
            id: trx.id.to_string(),
            user_id: trx.user_id.clone(),
            info: trx.info.clone(),
            status: trx.status.to_string(),
            trx_date: trx.trx_date,
            trx_timestamp: trx.trx_timestamp.to_rfc3339(),
        }
    }
}

/// Generate and write a batch into the partitioned table.
pub async fn create_partitioned(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<PartitionedBatchRequest>,
) -> Result<Json<Vec<TransactionResponse>>, ApiError> {
    let strategy = body.strategy.unwrap_or(state.config.default_strategy);
    if !strategy.is_partitioned() {
        return Err(ApiError::BadRequest(format!(
            "strategy {strategy} does not write to the partitioned table"
        )));
    }

    write_batch(&state, strategy, body.n, &body.user_id, body.date).await
}

/// Generate and write a batch into the flat table.
pub async fn create_unpartitioned(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<UnpartitionedBatchRequest>,
) -> Result<Json<Vec<TransactionResponse>>, ApiError> {
    write_batch(
        &state,
        InsertStrategy::Unpartitioned,
        body.n,
        &body.user_id,
        body.date,
    )
    .await
}

/// Fetch one transaction from the partitioned table.
pub async fn get_partitioned(
    State(state): State<Arc<AppState>>,
    Path((id, user_id, date)): Path<(String, String, String)>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let (id, date) = parse_key(&id, &date)?;
    let trx = state.ledger.fetch_partitioned(&id, &user_id, date).await?;
    Ok(Json(TransactionResponse::from(&trx)))
}

/// Fetch one transaction from the flat table.
pub async fn get_unpartitioned(
    State(state): State<Arc<AppState>>,
    Path((id, user_id, date)): Path<(String, String, String)>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let (id, date) = parse_key(&id, &date)?;
    let trx = state.ledger.fetch_unpartitioned(&id, &user_id, date).await?;
    Ok(Json(TransactionResponse::from(&trx)))
}

async fn write_batch(
    state: &AppState,
    strategy: InsertStrategy,
    n: usize,
    user_id: &str,
    at: DateTime<Utc>,
) -> Result<Json<Vec<TransactionResponse>>, ApiError> {
    if user_id.is_empty() {
        return Err(ApiError::BadRequest("user_id must not be empty".into()));
    }
    if n > state.config.max_batch_size {
        return Err(ApiError::BadRequest(format!(
            "n={n} exceeds the maximum batch size of {}",
            state.config.max_batch_size
        )));
    }

    let mut written = Vec::with_capacity(n);
    for i in 0..n {
        let trx = Transaction::sample(i, user_id, at);
        let stored = state.ledger.insert(strategy, &trx).await.map_err(|e| {
            tracing::warn!(
                strategy = %strategy,
                written = written.len(),
                error = %e,
                "Batch write stopped"
            );
            e
        })?;
        written.push(TransactionResponse::from(&stored));
    }

    tracing::info!(
        strategy = %strategy,
        user_id = %user_id,
        count = written.len(),
        "Batch written"
    );

    Ok(Json(written))
}

/// Parse the `id` and `date` path segments.
pub(crate) fn parse_key(id: &str, date: &str) -> Result<(TransactionId, NaiveDate), ApiError> {
    let id = id
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid id: {e}")))?;
    Ok((id, parse_date(date)?))
}

/// Parse a `YYYY-MM-DD` path segment.
pub(crate) fn parse_date(date: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| ApiError::BadRequest(format!("invalid date {date:?}: {e}")))
}
