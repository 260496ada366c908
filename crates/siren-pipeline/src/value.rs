//! Dynamic row values carried between stores
//!
//! [`SqlValue`] is the engine-neutral form of one cell. Decoding from the
//! source row and binding to the destination statement are both driven by
//! the column's [`ColumnType`] classification, so a column reads and writes
//! consistently. Values are always transported as bound parameters, never
//! interpolated into statement text.

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::mysql::MySqlRow;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;
use sqlx::Row;

use crate::typemap::ColumnType;

/// One cell read from the source store
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Text(String),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Bytes(Vec<u8>),
}

/// Decode one cell from a source row according to its classification.
///
/// Types the mapper sends to `Text` by fallback (decimal, enum, set, ...)
/// arrive in their textual wire form; when a direct string decode is not
/// possible the raw bytes are taken lossily.
pub fn decode_source_value(row: &MySqlRow, index: usize, ty: ColumnType) -> sqlx::Result<SqlValue> {
    let value = match ty {
        ColumnType::Integer => row
            .try_get::<Option<i64>, _>(index)?
            .map_or(SqlValue::Null, SqlValue::Int),
        ColumnType::Timestamp => row
            .try_get::<Option<NaiveDateTime>, _>(index)?
            .map_or(SqlValue::Null, SqlValue::Timestamp),
        ColumnType::Date => row
            .try_get::<Option<NaiveDate>, _>(index)?
            .map_or(SqlValue::Null, SqlValue::Date),
        ColumnType::Bytes => row
            .try_get::<Option<Vec<u8>>, _>(index)?
            .map_or(SqlValue::Null, SqlValue::Bytes),
        ColumnType::Text => match row.try_get::<Option<String>, _>(index) {
            Ok(text) => text.map_or(SqlValue::Null, SqlValue::Text),
            Err(_) => row
                .try_get::<Option<Vec<u8>>, _>(index)?
                .map_or(SqlValue::Null, |bytes| {
                    SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned())
                }),
        },
    };

    Ok(value)
}

/// Bind one value to a destination statement.
///
/// NULL binds as a typed `None` matching the column's classification so the
/// destination driver sees a properly typed placeholder.
pub fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &SqlValue,
    ty: ColumnType,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        SqlValue::Null => match ty {
            ColumnType::Integer => query.bind(None::<i64>),
            ColumnType::Text => query.bind(None::<String>),
            ColumnType::Timestamp => query.bind(None::<NaiveDateTime>),
            ColumnType::Date => query.bind(None::<NaiveDate>),
            ColumnType::Bytes => query.bind(None::<Vec<u8>>),
        },
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.clone()),
        SqlValue::Timestamp(v) => query.bind(*v),
        SqlValue::Date(v) => query.bind(*v),
        SqlValue::Bytes(v) => query.bind(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_equality() {
        assert_eq!(SqlValue::Int(7), SqlValue::Int(7));
        assert_ne!(SqlValue::Null, SqlValue::Int(0));
        assert_ne!(SqlValue::Text("1".into()), SqlValue::Int(1));
    }

    #[test]
    fn test_timestamp_value_roundtrips_chrono() {
        let ts = NaiveDate::from_ymd_opt(2025, 3, 22)
            .unwrap()
            .and_hms_opt(13, 45, 0)
            .unwrap();
        match SqlValue::Timestamp(ts) {
            SqlValue::Timestamp(inner) => assert_eq!(inner, ts),
            _ => unreachable!(),
        }
    }
}
