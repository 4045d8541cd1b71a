//! HTTP request handlers.

pub mod health;
pub mod partitions;
pub mod transactions;
