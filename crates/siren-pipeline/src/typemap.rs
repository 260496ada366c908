//! Source-to-destination type mapping
//!
//! Classifies a source (MySQL) column type string into the destination
//! (PostgreSQL) type system. The classification is used in two places and
//! must agree between them: rendering `CREATE TABLE` column types
//! ([`crate::schema`]) and decoding/binding row values
//! ([`crate::value`]). A column classified as [`ColumnType::Timestamp`]
//! is read and written as a timestamp everywhere.

use serde::{Deserialize, Serialize};

/// Destination column classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Text,
    Timestamp,
    Date,
    Bytes,
}

impl ColumnType {
    /// PostgreSQL type name used in generated DDL
    pub fn pg_type(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Date => "DATE",
            ColumnType::Bytes => "BYTEA",
        }
    }
}

/// A column as introspected from the source store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub source_type: String,
    pub nullable: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, source_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            source_type: source_type.into(),
            nullable,
        }
    }

    /// Destination classification for this column
    pub fn column_type(&self) -> ColumnType {
        map_source_type(&self.source_type)
    }
}

/// Map a source type string to its destination classification.
///
/// Total function: case-insensitive substring matching in fixed precedence
/// order, falling back to `Text` for anything unrecognized. `datetime` is
/// tested before `date` so the substring overlap resolves correctly.
pub fn map_source_type(source_type: &str) -> ColumnType {
    let ty = source_type.to_lowercase();

    if ty.contains("int") {
        ColumnType::Integer
    } else if ty.contains("char") || ty.contains("text") {
        ColumnType::Text
    } else if ty.contains("datetime") || ty.contains("timestamp") {
        ColumnType::Timestamp
    } else if ty.contains("blob") || ty.contains("binary") {
        ColumnType::Bytes
    } else if ty.contains("date") {
        ColumnType::Date
    } else {
        ColumnType::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_like() {
        assert_eq!(map_source_type("int(11)"), ColumnType::Integer);
        assert_eq!(map_source_type("BIGINT"), ColumnType::Integer);
        assert_eq!(map_source_type("tinyint(1)"), ColumnType::Integer);
        assert_eq!(map_source_type("smallint unsigned"), ColumnType::Integer);
    }

    #[test]
    fn test_text_like() {
        assert_eq!(map_source_type("varchar(255)"), ColumnType::Text);
        assert_eq!(map_source_type("CHAR(2)"), ColumnType::Text);
        assert_eq!(map_source_type("longtext"), ColumnType::Text);
    }

    #[test]
    fn test_temporal_precedence() {
        // "datetime" contains "date"; classification must pick Timestamp
        assert_eq!(map_source_type("datetime"), ColumnType::Timestamp);
        assert_eq!(map_source_type("TIMESTAMP"), ColumnType::Timestamp);
        assert_eq!(map_source_type("date"), ColumnType::Date);
    }

    #[test]
    fn test_binary_like() {
        assert_eq!(map_source_type("blob"), ColumnType::Bytes);
        assert_eq!(map_source_type("LONGBLOB"), ColumnType::Bytes);
        assert_eq!(map_source_type("varbinary(64)"), ColumnType::Bytes);
    }

    #[test]
    fn test_fallback_is_text() {
        assert_eq!(map_source_type("decimal(10,2)"), ColumnType::Text);
        assert_eq!(map_source_type("enum('a','b')"), ColumnType::Text);
        assert_eq!(map_source_type("something-new"), ColumnType::Text);
    }

    #[test]
    fn test_deterministic() {
        for ty in ["int", "varchar(16)", "datetime", "date", "blob", "set"] {
            assert_eq!(map_source_type(ty), map_source_type(ty));
        }
    }
}
