//! HTTP API for partitioned transaction storage.
//!
//! This crate exposes the write strategies and point fetches of
//! [`trx_partition_store::Ledger`] over HTTP:
//!
//! - Batch writes into the partitioned table (any strategy) or the flat table
//! - Point fetches from either table
//! - Child partition management (ensure and probe)
//!
//! Request and response bodies are JSON.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Axum handlers must be async

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use extract::ApiJson;
pub use routes::create_router;
pub use state::AppState;
