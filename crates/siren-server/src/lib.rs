//! SIREN Server Library
//!
//! HTTP surface over the alarm migration and reporting pipeline.
//!
//! # Overview
//!
//! The server exposes the pipeline's operations as a small REST API:
//!
//! - **Migration**: trigger a one-shot table migration by name
//! - **Partitioning**: materialize per-date partition tables and ledger rows
//! - **Reporting**: run the claim-export-mark report cycle, poll the ledger
//! - **Reads**: page through a migrated partition table by date
//!
//! Handlers are thin: they validate primitive parameters, call into
//! `siren-pipeline`, and render structured results or errors as JSON. A
//! background scheduler can drive partition-then-report on an interval.

pub mod config;
pub mod error;
pub mod pagination;
pub mod routes;
pub mod scheduler;

// Re-export commonly used types
pub use error::{AppError, AppResult};
