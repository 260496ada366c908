//! One-shot table migration
//!
//! The source-to-destination path for any named table: introspect, translate
//! and execute the destination DDL, bulk-load the rows, then normalize the
//! destination column names. Re-running drops and recreates the destination
//! table, so a migration is safe to repeat and destructive to prior
//! destination data.

use sqlx::postgres::PgPool;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::loader::ChunkedBulkLoader;
use crate::normalize::ColumnNormalizer;
use crate::schema;
use crate::source::SourceStore;

/// Default rows per bulk-insert chunk
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default concurrent destination workers
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Outcome of one table migration
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub table: String,
    pub columns: usize,
    pub rows_read: usize,
    pub inserted: u64,
    pub renamed: Vec<String>,
}

/// Drives the migration path end to end
#[derive(Clone)]
pub struct Migrator {
    source: SourceStore,
    dest: PgPool,
    loader: ChunkedBulkLoader,
    normalizer: ColumnNormalizer,
}

impl Migrator {
    pub fn new(source: SourceStore, dest: PgPool, destination_url: impl Into<String>) -> Self {
        let loader =
            ChunkedBulkLoader::new(destination_url, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_WORKERS);
        let normalizer = ColumnNormalizer::new(dest.clone());
        Self {
            source,
            dest,
            loader,
            normalizer,
        }
    }

    /// Override the loader's chunk size and worker bound
    pub fn with_load_settings(
        source: SourceStore,
        dest: PgPool,
        destination_url: impl Into<String>,
        chunk_size: usize,
        max_workers: usize,
    ) -> Self {
        let loader = ChunkedBulkLoader::new(destination_url, chunk_size, max_workers);
        let normalizer = ColumnNormalizer::new(dest.clone());
        Self {
            source,
            dest,
            loader,
            normalizer,
        }
    }

    /// Migrate `table` from the source store into the destination store
    pub async fn migrate_table(&self, table: &str) -> Result<MigrationReport> {
        let columns = self.source.describe(table).await?;
        if columns.is_empty() {
            return Err(PipelineError::schema(table, "table not found or has no columns"));
        }

        let ddl = schema::translate(table, &columns)?;
        sqlx::raw_sql(&ddl).execute(&self.dest).await?;
        info!(table = %table, columns = columns.len(), "destination table created");

        let rows = self.source.fetch_rows(table, &columns).await?;
        let rows_read = rows.len();

        let load = self.loader.load(table, &columns, rows).await?;

        // Runs strictly after the load; it rewrites the schema the loader
        // wrote against.
        let renamed = self.normalizer.normalize(table).await?;

        let report = MigrationReport {
            table: table.to_string(),
            columns: columns.len(),
            rows_read,
            inserted: load.inserted,
            renamed,
        };
        info!(
            table = %report.table,
            rows_read = report.rows_read,
            inserted = report.inserted,
            renamed = report.renamed.len(),
            "migration complete"
        );
        Ok(report)
    }
}
