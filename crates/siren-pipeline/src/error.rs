//! Pipeline error types
//!
//! Worker-local failures (a single chunk or partition date) are collected by
//! their aggregation points and reported alongside sibling successes; the
//! variants here carry enough context (table, date, chunk index) to retry
//! just the failed unit. Retry itself is caller policy.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline error type
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source table has no columns or an otherwise unusable schema
    #[error("Schema error for table '{table}': {message}")]
    Schema { table: String, message: String },

    /// A bulk-load chunk failed. Chunks already committed by sibling workers
    /// are not rolled back; `inserted` counts those rows. Callers needing
    /// all-or-nothing must re-run the whole table (the translator's DDL
    /// drops and recreates it).
    #[error("Bulk load into '{table}' failed at chunk {chunk_index} ({inserted} rows committed in sibling chunks): {source}")]
    BulkLoad {
        table: String,
        chunk_index: usize,
        inserted: u64,
        #[source]
        source: sqlx::Error,
    },

    /// Partition materialization failed for one date; sibling dates are
    /// unaffected.
    #[error("Partitioning failed for date {date}: {source}")]
    Partition {
        date: NaiveDate,
        #[source]
        source: sqlx::Error,
    },

    /// File-write or archive failure during export. Fail-fast: intermediate
    /// files are left in place for the caller to inspect or remove.
    #[error("Export failed at '{path}': {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Create a schema error with table context
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create an export error with the offending path
    pub fn export(
        path: impl Into<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Export {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_carries_table() {
        let err = PipelineError::schema("backalerts", "no columns");
        assert_eq!(
            err.to_string(),
            "Schema error for table 'backalerts': no columns"
        );
    }

    #[test]
    fn test_bulk_load_error_carries_chunk_index() {
        let err = PipelineError::BulkLoad {
            table: "backalerts".into(),
            chunk_index: 3,
            inserted: 2000,
            source: sqlx::Error::PoolClosed,
        };
        let msg = err.to_string();
        assert!(msg.contains("chunk 3"));
        assert!(msg.contains("2000 rows"));
    }
}
