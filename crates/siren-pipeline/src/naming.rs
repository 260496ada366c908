//! Identifier naming and quoting
//!
//! The single authority for partition-table naming and for identifier
//! quoting on either engine. PartitionBuilder writes tables named here,
//! ReportTracker records those names, and readers re-derive them from a
//! date, all through [`partition_table_name`], so writer and reader can
//! never drift.

use chrono::NaiveDate;

/// Partition table name for a given date: `<prefix>_YYYYMMDD`
pub fn partition_table_name(prefix: &str, date: NaiveDate) -> String {
    format!("{}_{}", prefix, date.format("%Y%m%d"))
}

/// Quote an identifier for PostgreSQL, preserving case
pub fn pg_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote an identifier for MySQL
pub fn mysql_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_table_name() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 22).unwrap();
        assert_eq!(partition_table_name("backalerts", date), "backalerts_20250322");
    }

    #[test]
    fn test_partition_name_is_deterministic() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        assert_eq!(
            partition_table_name("alerts", date),
            partition_table_name("alerts", date)
        );
    }

    #[test]
    fn test_pg_ident_preserves_case_and_escapes() {
        assert_eq!(pg_ident("Panel_Make"), "\"Panel_Make\"");
        assert_eq!(pg_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_mysql_ident_escapes_backticks() {
        assert_eq!(mysql_ident("backalerts"), "`backalerts`");
        assert_eq!(mysql_ident("we`ird"), "`we``ird`");
    }
}
