//! Source store access
//!
//! Wraps the operational (MySQL) pool behind the two operations the
//! pipeline needs: column introspection and full-table reads decoded to
//! [`SqlValue`] rows. The handle is injected into components; nothing here
//! creates ad-hoc connections per call.

use sqlx::mysql::MySqlPool;
use tracing::debug;

use crate::error::Result;
use crate::naming::mysql_ident;
use crate::typemap::{ColumnDescriptor, ColumnType};
use crate::value::{decode_source_value, SqlValue};

/// Query-capable handle to the operational store
#[derive(Clone)]
pub struct SourceStore {
    pool: MySqlPool,
}

impl SourceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Connect with driver defaults
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Introspect a table's columns in ordinal order
    pub async fn describe(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT column_name, column_type, is_nullable \
             FROM information_schema.columns \
             WHERE table_schema = DATABASE() AND table_name = ? \
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let columns = rows
            .into_iter()
            .map(|(name, source_type, nullable)| {
                ColumnDescriptor::new(name, source_type, nullable.eq_ignore_ascii_case("YES"))
            })
            .collect::<Vec<_>>();

        debug!(table = %table, columns = columns.len(), "described source table");
        Ok(columns)
    }

    /// Read every row of `table`, decoding each cell by its column
    /// classification. Column order follows `columns`, which callers obtain
    /// from [`SourceStore::describe`] so it matches the table definition.
    pub async fn fetch_rows(
        &self,
        table: &str,
        columns: &[ColumnDescriptor],
    ) -> Result<Vec<Vec<SqlValue>>> {
        let select_list = columns
            .iter()
            .map(|col| mysql_ident(&col.name))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {} FROM {}", select_list, mysql_ident(table));

        let types: Vec<ColumnType> = columns.iter().map(|col| col.column_type()).collect();

        let raw = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut rows = Vec::with_capacity(raw.len());
        for row in &raw {
            let mut values = Vec::with_capacity(types.len());
            for (index, ty) in types.iter().enumerate() {
                values.push(decode_source_value(row, index, *ty)?);
            }
            rows.push(values);
        }

        debug!(table = %table, rows = rows.len(), "fetched source rows");
        Ok(rows)
    }
}
