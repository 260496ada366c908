//! Chunked parallel bulk loading
//!
//! Splits a row set into contiguous chunks and drives a bounded pool of
//! workers. Each worker claims chunks off a shared counter and opens a
//! fresh destination connection per chunk; the destination driver is not
//! assumed safe for uncoordinated concurrent multi-statement use, so no
//! connection is ever shared or reused across chunks. Workers communicate
//! nothing but their per-chunk results back to the aggregation point.
//!
//! There is no cross-chunk transaction: chunks committed before a sibling
//! fails stay committed. Callers needing all-or-nothing re-run the whole
//! table behind the translator's drop-and-recreate DDL.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sqlx::postgres::PgConnection;
use sqlx::Connection;
use tracing::{debug, error, info, warn};

use crate::error::{PipelineError, Result};
use crate::naming::pg_ident;
use crate::typemap::{ColumnDescriptor, ColumnType};
use crate::value::{bind_value, SqlValue};

/// PostgreSQL limits one statement to u16::MAX bind parameters.
const MAX_BIND_PARAMS: usize = 65_535;

/// Outcome of a completed load
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub inserted: u64,
    pub chunks: usize,
}

/// Parallel chunked loader for the destination store
#[derive(Clone)]
pub struct ChunkedBulkLoader {
    destination_url: String,
    chunk_size: usize,
    max_workers: usize,
}

impl ChunkedBulkLoader {
    pub fn new(destination_url: impl Into<String>, chunk_size: usize, max_workers: usize) -> Self {
        Self {
            destination_url: destination_url.into(),
            chunk_size: chunk_size.max(1),
            max_workers: max_workers.max(1),
        }
    }

    /// Load `rows` into `dest_table`.
    ///
    /// Waits for every dispatched worker; a chunk failure does not stop
    /// sibling chunks, but the overall call then fails with the first
    /// failing chunk's index and cause. `LoadReport::inserted` counts rows
    /// across all successful chunks.
    pub async fn load(
        &self,
        dest_table: &str,
        columns: &[ColumnDescriptor],
        rows: Vec<Vec<SqlValue>>,
    ) -> Result<LoadReport> {
        if columns.is_empty() {
            return Err(PipelineError::schema(dest_table, "no columns to load"));
        }
        if let Some(bad) = rows.iter().position(|row| row.len() != columns.len()) {
            return Err(PipelineError::schema(
                dest_table,
                format!(
                    "row {} has {} values for {} columns",
                    bad,
                    rows[bad].len(),
                    columns.len()
                ),
            ));
        }
        if rows.is_empty() {
            return Ok(LoadReport {
                inserted: 0,
                chunks: 0,
            });
        }

        let chunk_size = effective_chunk_size(self.chunk_size, columns.len());
        if chunk_size < self.chunk_size {
            warn!(
                requested = self.chunk_size,
                effective = chunk_size,
                columns = columns.len(),
                "chunk size clamped to stay under the bind-parameter ceiling"
            );
        }

        let chunks = Arc::new(split_chunks(rows, chunk_size));
        let names: Arc<Vec<String>> =
            Arc::new(columns.iter().map(|col| col.name.clone()).collect());
        let types: Arc<Vec<ColumnType>> =
            Arc::new(columns.iter().map(|col| col.column_type()).collect());
        let next_chunk = Arc::new(AtomicUsize::new(0));

        let num_workers = self.max_workers.min(chunks.len());
        info!(
            table = %dest_table,
            chunks = chunks.len(),
            chunk_size = chunk_size,
            workers = num_workers,
            "starting bulk load"
        );

        let mut handles = Vec::with_capacity(num_workers);
        for worker in 0..num_workers {
            let url = self.destination_url.clone();
            let table = dest_table.to_string();
            let chunks = chunks.clone();
            let names = names.clone();
            let types = types.clone();
            let next_chunk = next_chunk.clone();

            handles.push(tokio::spawn(async move {
                run_worker(worker, &url, &table, &chunks, &names, &types, &next_chunk).await
            }));
        }

        let mut inserted = 0u64;
        let mut failures: Vec<(usize, sqlx::Error)> = Vec::new();

        for handle in handles {
            match handle.await {
                Ok(results) => {
                    for (index, result) in results {
                        match result {
                            Ok(count) => inserted += count,
                            Err(e) => failures.push((index, e)),
                        }
                    }
                },
                Err(e) => {
                    error!(table = %dest_table, error = %e, "bulk-load worker panicked");
                    failures.push((usize::MAX, sqlx::Error::WorkerCrashed));
                },
            }
        }

        if let Some((chunk_index, source)) = failures
            .into_iter()
            .min_by_key(|(index, _)| *index)
        {
            return Err(PipelineError::BulkLoad {
                table: dest_table.to_string(),
                chunk_index,
                inserted,
                source,
            });
        }

        info!(table = %dest_table, inserted = inserted, "bulk load complete");
        Ok(LoadReport {
            inserted,
            chunks: chunks.len(),
        })
    }
}

/// One worker: claim chunks until none remain, one fresh connection each.
async fn run_worker(
    worker: usize,
    url: &str,
    table: &str,
    chunks: &[Vec<Vec<SqlValue>>],
    names: &[String],
    types: &[ColumnType],
    next_chunk: &AtomicUsize,
) -> Vec<(usize, std::result::Result<u64, sqlx::Error>)> {
    let mut results = Vec::new();

    loop {
        let index = next_chunk.fetch_add(1, Ordering::SeqCst);
        if index >= chunks.len() {
            break;
        }

        let result = insert_chunk(url, table, names, types, &chunks[index]).await;
        match &result {
            Ok(count) => {
                debug!(worker = worker, chunk = index, rows = count, "chunk committed")
            },
            Err(e) => {
                error!(worker = worker, chunk = index, error = %e, "chunk failed")
            },
        }
        results.push((index, result));
    }

    results
}

/// Insert one chunk over its own connection, closed before returning.
async fn insert_chunk(
    url: &str,
    table: &str,
    names: &[String],
    types: &[ColumnType],
    chunk: &[Vec<SqlValue>],
) -> std::result::Result<u64, sqlx::Error> {
    let mut conn = PgConnection::connect(url).await?;

    let sql = build_insert_sql(table, names, chunk.len());
    let mut query = sqlx::query(&sql);
    for row in chunk {
        for (value, ty) in row.iter().zip(types) {
            query = bind_value(query, value, *ty);
        }
    }

    let outcome = query.execute(&mut conn).await;

    if let Err(e) = conn.close().await {
        warn!(error = %e, "destination connection did not close cleanly");
    }

    outcome.map(|done| done.rows_affected())
}

/// Multi-row parameterized INSERT referencing the destination column list
fn build_insert_sql(table: &str, names: &[String], row_count: usize) -> String {
    let column_list = names
        .iter()
        .map(|name| pg_ident(name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut placeholder = 1usize;
    let values = (0..row_count)
        .map(|_| {
            let row = (0..names.len())
                .map(|_| {
                    let p = format!("${}", placeholder);
                    placeholder += 1;
                    p
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", row)
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        pg_ident(table),
        column_list,
        values
    )
}

/// Largest chunk size keeping `rows * columns` under the bind ceiling
fn effective_chunk_size(requested: usize, column_count: usize) -> usize {
    let ceiling = (MAX_BIND_PARAMS / column_count.max(1)).max(1);
    requested.min(ceiling)
}

/// Split rows into contiguous chunks of at most `chunk_size`, preserving
/// source-read order within each chunk
fn split_chunks(mut rows: Vec<Vec<SqlValue>>, chunk_size: usize) -> Vec<Vec<Vec<SqlValue>>> {
    let mut chunks = Vec::with_capacity(rows.len().div_ceil(chunk_size));
    while !rows.is_empty() {
        let tail = rows.split_off(chunk_size.min(rows.len()));
        chunks.push(std::mem::replace(&mut rows, tail));
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(n: i64) -> Vec<SqlValue> {
        vec![SqlValue::Int(n), SqlValue::Text(format!("r{}", n))]
    }

    #[test]
    fn test_split_chunks_counts() {
        let rows: Vec<_> = (0..25).map(row).collect();
        let chunks = split_chunks(rows, 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 10);
        assert_eq!(chunks[1].len(), 10);
        assert_eq!(chunks[2].len(), 5);
    }

    #[test]
    fn test_split_chunks_preserves_order() {
        let rows: Vec<_> = (0..7).map(row).collect();
        let chunks = split_chunks(rows, 3);
        assert_eq!(chunks[0][0][0], SqlValue::Int(0));
        assert_eq!(chunks[1][0][0], SqlValue::Int(3));
        assert_eq!(chunks[2][0][0], SqlValue::Int(6));
    }

    #[test]
    fn test_split_chunks_exact_multiple() {
        let rows: Vec<_> = (0..20).map(row).collect();
        assert_eq!(split_chunks(rows, 10).len(), 2);
    }

    #[test]
    fn test_effective_chunk_size_clamps() {
        // 20 columns -> ceiling of 3276 rows per statement
        assert_eq!(effective_chunk_size(10_000, 20), 3276);
        assert_eq!(effective_chunk_size(1_000, 20), 1_000);
        assert_eq!(effective_chunk_size(5, 0), 5);
    }

    #[test]
    fn test_build_insert_sql_placeholders() {
        let names = vec!["id".to_string(), "Panel_Make".to_string()];
        let sql = build_insert_sql("backalerts", &names, 3);
        assert_eq!(
            sql,
            "INSERT INTO \"backalerts\" (\"id\", \"Panel_Make\") \
             VALUES ($1, $2), ($3, $4), ($5, $6)"
        );
    }
}
