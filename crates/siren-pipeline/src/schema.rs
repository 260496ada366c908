//! Destination schema translation
//!
//! Renders the destination DDL for a source table: unconditional drop, then
//! create with one column per descriptor typed via [`crate::typemap`].
//! Identifiers are double-quoted so source casing survives creation (the
//! normalizer lowercases them after load). Re-running the DDL is idempotent
//! because of the drop, and destructive to prior destination data, which
//! callers must be aware of.

use crate::error::{PipelineError, Result};
use crate::naming::pg_ident;
use crate::typemap::ColumnDescriptor;

/// Build the destination DDL for `table`.
///
/// Fails only when `columns` is empty.
pub fn translate(table: &str, columns: &[ColumnDescriptor]) -> Result<String> {
    if columns.is_empty() {
        return Err(PipelineError::schema(table, "source table has no columns"));
    }

    let column_defs = columns
        .iter()
        .map(|col| format!("{} {}", pg_ident(&col.name), col.column_type().pg_type()))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        "DROP TABLE IF EXISTS {table}; CREATE TABLE {table} ({column_defs})",
        table = pg_ident(table),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typemap::ColumnDescriptor;

    fn columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("id", "int(11)", false),
            ColumnDescriptor::new("Panel_Make", "varchar(64)", true),
            ColumnDescriptor::new("receivedtime", "datetime", true),
            ColumnDescriptor::new("photo", "blob", true),
            ColumnDescriptor::new("alert_date", "date", true),
        ]
    }

    #[test]
    fn test_translate_renders_drop_then_create() {
        let ddl = translate("backalerts", &columns()).unwrap();
        assert_eq!(
            ddl,
            "DROP TABLE IF EXISTS \"backalerts\"; CREATE TABLE \"backalerts\" \
             (\"id\" INTEGER, \"Panel_Make\" TEXT, \"receivedtime\" TIMESTAMP, \
             \"photo\" BYTEA, \"alert_date\" DATE)"
        );
    }

    #[test]
    fn test_translate_preserves_source_case() {
        let ddl = translate("backalerts", &columns()).unwrap();
        assert!(ddl.contains("\"Panel_Make\""));
    }

    #[test]
    fn test_translate_is_deterministic() {
        let cols = columns();
        assert_eq!(
            translate("t", &cols).unwrap(),
            translate("t", &cols).unwrap()
        );
    }

    #[test]
    fn test_empty_columns_is_schema_error() {
        let err = translate("empty", &[]).unwrap_err();
        assert!(matches!(err, PipelineError::Schema { .. }));
    }
}
