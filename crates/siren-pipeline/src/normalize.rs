//! Destination column-name normalization
//!
//! The translator preserves source casing at creation time; once the load
//! completes this pass renames every destination column to its lowercase
//! form so downstream readers query one canonical spelling. Idempotent: a
//! second run finds nothing to rename. Must run strictly after bulk load,
//! since it mutates the schema the loader wrote against.

use sqlx::postgres::PgPool;
use tracing::{debug, info};

use crate::error::Result;
use crate::naming::pg_ident;

/// Lowercases destination column names in place
#[derive(Clone)]
pub struct ColumnNormalizer {
    dest: PgPool,
}

impl ColumnNormalizer {
    pub fn new(dest: PgPool) -> Self {
        Self { dest }
    }

    /// Rename every non-lowercase column of `table`; returns the new names.
    /// An already-normalized table yields an empty list.
    pub async fn normalize(&self, table: &str) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = 'public' AND table_name = $1",
        )
        .bind(table)
        .fetch_all(&self.dest)
        .await?;

        let renames = plan_renames(names);
        if renames.is_empty() {
            debug!(table = %table, "columns already normalized");
            return Ok(Vec::new());
        }

        let mut renamed = Vec::with_capacity(renames.len());
        for (from, to) in renames {
            let sql = format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {}",
                pg_ident(table),
                pg_ident(&from),
                pg_ident(&to),
            );
            sqlx::query(&sql).execute(&self.dest).await?;
            renamed.push(to);
        }

        info!(table = %table, renamed = renamed.len(), "normalized column names");
        Ok(renamed)
    }
}

/// Pure rename plan: every name not already equal to its lowercase form
fn plan_renames(names: Vec<String>) -> Vec<(String, String)> {
    names
        .into_iter()
        .filter_map(|name| {
            let lower = name.to_lowercase();
            (name != lower).then_some((name, lower))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_renames_skips_lowercase() {
        let plan = plan_renames(vec![
            "id".to_string(),
            "Panel_Make".to_string(),
            "City".to_string(),
            "receivedtime".to_string(),
        ]);
        assert_eq!(
            plan,
            vec![
                ("Panel_Make".to_string(), "panel_make".to_string()),
                ("City".to_string(), "city".to_string()),
            ]
        );
    }

    #[test]
    fn test_plan_renames_is_idempotent() {
        let first = plan_renames(vec!["Panel_Make".to_string(), "id".to_string()]);
        let after: Vec<String> = first.iter().map(|(_, to)| to.clone()).collect();
        assert!(plan_renames(after).is_empty());
    }

    #[test]
    fn test_plan_preserves_order() {
        let plan = plan_renames(vec!["B".to_string(), "A".to_string()]);
        assert_eq!(plan[0].0, "B");
        assert_eq!(plan[1].0, "A");
    }
}
