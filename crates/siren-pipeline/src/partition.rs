//! Date-based partition materialization
//!
//! Discovers the distinct event dates in the source table, then drives a
//! bounded pool of workers that each materialize one date's partition via
//! `CREATE TABLE ... AS SELECT`, count its rows, and upsert the ledger.
//! Dates are independent failure domains: one failed date surfaces in the
//! run result without blocking its siblings.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::mysql::MySqlPool;
use tracing::{error, info};

use crate::error::{PipelineError, Result};
use crate::naming::{mysql_ident, partition_table_name};
use crate::tracker::{PartitionLedgerEntry, ReportTracker};

/// Outcome of one partitioning run
#[derive(Debug)]
pub struct PartitionRun {
    pub completed: Vec<PartitionLedgerEntry>,
    pub failed: Vec<(NaiveDate, PipelineError)>,
}

/// Materializes per-date partition tables on the operational store
#[derive(Clone)]
pub struct PartitionBuilder {
    pool: MySqlPool,
    tracker: ReportTracker,
    source_table: String,
    date_column: String,
    max_workers: usize,
}

impl PartitionBuilder {
    pub fn new(
        pool: MySqlPool,
        source_table: impl Into<String>,
        date_column: impl Into<String>,
        max_workers: usize,
    ) -> Self {
        let tracker = ReportTracker::new(pool.clone());
        Self {
            pool,
            tracker,
            source_table: source_table.into(),
            date_column: date_column.into(),
            max_workers: max_workers.max(1),
        }
    }

    /// Partition every distinct event date at or after `since`.
    ///
    /// Re-running for an already-partitioned date recomputes only its
    /// ledger record count: `CREATE TABLE IF NOT EXISTS` leaves the
    /// existing partition alone and the ledger upsert never duplicates a
    /// date.
    pub async fn partition_by_date(&self, since: NaiveDate) -> Result<PartitionRun> {
        self.tracker.ensure_ledger().await?;

        let dates = self.discover_dates(since).await?;
        if dates.is_empty() {
            info!(table = %self.source_table, since = %since, "no event dates to partition");
            return Ok(PartitionRun {
                completed: Vec::new(),
                failed: Vec::new(),
            });
        }

        info!(
            table = %self.source_table,
            since = %since,
            dates = dates.len(),
            "partitioning by date"
        );

        let dates = Arc::new(dates);
        let next_date = Arc::new(AtomicUsize::new(0));
        let num_workers = self.max_workers.min(dates.len());

        let mut handles = Vec::with_capacity(num_workers);
        for _ in 0..num_workers {
            let builder = self.clone();
            let dates = dates.clone();
            let next_date = next_date.clone();

            handles.push(tokio::spawn(async move {
                let mut results = Vec::new();
                loop {
                    let index = next_date.fetch_add(1, Ordering::SeqCst);
                    if index >= dates.len() {
                        break;
                    }
                    let date = dates[index];
                    results.push((date, builder.materialize_date(date).await));
                }
                results
            }));
        }

        let mut completed = Vec::new();
        let mut failed = Vec::new();

        for handle in handles {
            match handle.await {
                Ok(results) => {
                    for (date, result) in results {
                        match result {
                            Ok(entry) => completed.push(entry),
                            Err(e) => {
                                error!(date = %date, error = %e, "partition failed");
                                failed.push((date, e));
                            },
                        }
                    }
                },
                Err(e) => {
                    error!(error = %e, "partition worker panicked");
                },
            }
        }

        completed.sort_by_key(|entry| entry.partition_date);
        info!(
            table = %self.source_table,
            completed = completed.len(),
            failed = failed.len(),
            "partitioning run finished"
        );

        Ok(PartitionRun { completed, failed })
    }

    /// Distinct event dates at or after `since`, oldest first
    async fn discover_dates(&self, since: NaiveDate) -> Result<Vec<NaiveDate>> {
        let sql = format!(
            "SELECT DISTINCT DATE({col}) AS event_date FROM {table} \
             WHERE DATE({col}) >= ? ORDER BY event_date",
            col = mysql_ident(&self.date_column),
            table = mysql_ident(&self.source_table),
        );

        let dates: Vec<NaiveDate> = sqlx::query_scalar(&sql)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;
        Ok(dates)
    }

    /// Materialize one date: create-as-select, count, upsert ledger.
    ///
    /// The worker holds one pooled connection for the table work; create-as-
    /// select mirrors the source schema at call time.
    async fn materialize_date(&self, date: NaiveDate) -> Result<PartitionLedgerEntry> {
        let table_name = partition_table_name(&self.source_table, date);

        let result: std::result::Result<i64, sqlx::Error> = async {
            let mut conn = self.pool.acquire().await?;

            let create = format!(
                "CREATE TABLE IF NOT EXISTS {partition} AS \
                 SELECT * FROM {source} WHERE DATE({col}) = ?",
                partition = mysql_ident(&table_name),
                source = mysql_ident(&self.source_table),
                col = mysql_ident(&self.date_column),
            );
            sqlx::query(&create).bind(date).execute(&mut *conn).await?;

            let count: i64 =
                sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", mysql_ident(&table_name)))
                    .fetch_one(&mut *conn)
                    .await?;

            Ok(count)
        }
        .await;

        let record_count = result.map_err(|source| PipelineError::Partition { date, source })?;

        let entry = self.tracker.upsert(date, &table_name, record_count).await?;
        info!(
            date = %date,
            table = %table_name,
            records = record_count,
            "partition materialized"
        );
        Ok(entry)
    }
}
