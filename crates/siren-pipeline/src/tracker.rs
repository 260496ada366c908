//! Partition tracking ledger
//!
//! One row per partitioned date in the `partition_ledger` table on the
//! operational store. PartitionBuilder upserts rows (recomputing only the
//! record count on conflict); report generation claims the oldest pending
//! row and marks it created after a successful export. The state transition
//! is one-way: `pending` never comes back.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlPool;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

/// Ledger row state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerState {
    Pending,
    Created,
}

impl LedgerState {
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerState::Pending => "pending",
            LedgerState::Created => "created",
        }
    }
}

impl std::str::FromStr for LedgerState {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(LedgerState::Pending),
            "created" => Ok(LedgerState::Created),
            other => Err(PipelineError::schema(
                "partition_ledger",
                format!("unknown ledger state '{}'", other),
            )),
        }
    }
}

impl std::fmt::Display for LedgerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionLedgerEntry {
    pub id: i64,
    pub partition_date: NaiveDate,
    pub table_name: String,
    pub record_count: i64,
    pub state: LedgerState,
}

/// Ledger access over the operational store
#[derive(Clone)]
pub struct ReportTracker {
    pool: MySqlPool,
}

const SELECT_ENTRY: &str =
    "SELECT id, partition_date, table_name, record_count, state FROM partition_ledger";

impl ReportTracker {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Create the ledger table when absent
    pub async fn ensure_ledger(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS partition_ledger (\
               id BIGINT AUTO_INCREMENT PRIMARY KEY, \
               partition_date DATE NOT NULL UNIQUE, \
               table_name VARCHAR(128) NOT NULL, \
               record_count BIGINT NOT NULL DEFAULT 0, \
               state VARCHAR(16) NOT NULL DEFAULT 'pending', \
               created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP, \
               updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP \
                 ON UPDATE CURRENT_TIMESTAMP\
             )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upsert the row for `date`. On conflict only `record_count` is
    /// recomputed; identity and state are never overwritten, so re-running
    /// partitioning cannot resurrect a reported date.
    pub async fn upsert(
        &self,
        date: NaiveDate,
        table_name: &str,
        record_count: i64,
    ) -> Result<PartitionLedgerEntry> {
        sqlx::query(
            "INSERT INTO partition_ledger (partition_date, table_name, record_count) \
             VALUES (?, ?, ?) \
             ON DUPLICATE KEY UPDATE record_count = VALUES(record_count)",
        )
        .bind(date)
        .bind(table_name)
        .bind(record_count)
        .execute(&self.pool)
        .await?;

        let entry = self.get_by_date(date).await?.ok_or_else(|| {
            PipelineError::schema("partition_ledger", format!("missing entry for {}", date))
        })?;

        debug!(date = %date, records = record_count, "ledger upserted");
        Ok(entry)
    }

    /// Oldest pending entry, or `None` when everything is reported.
    ///
    /// Intended for a single report-generation process; there is no
    /// distributed lock, so concurrent callers may double-claim.
    pub async fn claim_next_pending(&self) -> Result<Option<PartitionLedgerEntry>> {
        let row: Option<(i64, NaiveDate, String, i64, String)> = sqlx::query_as(&format!(
            "{} WHERE state = 'pending' ORDER BY partition_date ASC LIMIT 1",
            SELECT_ENTRY
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_entry).transpose()
    }

    /// Transition an entry to `created`; a second call is a no-op
    pub async fn mark_created(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE partition_ledger SET state = 'created' WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        info!(id = id, "ledger entry marked created");
        Ok(())
    }

    /// Newest ledger row regardless of state (polling endpoint)
    pub async fn latest_entry(&self) -> Result<Option<PartitionLedgerEntry>> {
        let row: Option<(i64, NaiveDate, String, i64, String)> = sqlx::query_as(&format!(
            "{} ORDER BY partition_date DESC LIMIT 1",
            SELECT_ENTRY
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_entry).transpose()
    }

    /// Entry for a specific date
    pub async fn get_by_date(&self, date: NaiveDate) -> Result<Option<PartitionLedgerEntry>> {
        let row: Option<(i64, NaiveDate, String, i64, String)> =
            sqlx::query_as(&format!("{} WHERE partition_date = ?", SELECT_ENTRY))
                .bind(date)
                .fetch_optional(&self.pool)
                .await?;

        row.map(decode_entry).transpose()
    }
}

fn decode_entry(
    (id, partition_date, table_name, record_count, state): (i64, NaiveDate, String, i64, String),
) -> Result<PartitionLedgerEntry> {
    Ok(PartitionLedgerEntry {
        id,
        partition_date,
        table_name,
        record_count,
        state: state.parse()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_roundtrip() {
        assert_eq!("pending".parse::<LedgerState>().unwrap(), LedgerState::Pending);
        assert_eq!("created".parse::<LedgerState>().unwrap(), LedgerState::Created);
        assert_eq!(LedgerState::Pending.to_string(), "pending");
    }

    #[test]
    fn test_unknown_state_is_error() {
        assert!("archived".parse::<LedgerState>().is_err());
    }

    #[test]
    fn test_decode_entry() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 22).unwrap();
        let entry = decode_entry((
            7,
            date,
            "backalerts_20250322".to_string(),
            1000,
            "pending".to_string(),
        ))
        .unwrap();
        assert_eq!(entry.id, 7);
        assert_eq!(entry.record_count, 1000);
        assert_eq!(entry.state, LedgerState::Pending);
    }
}
