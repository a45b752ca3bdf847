//! Row mapping traits and utilities

use crate::error::{OrmError, OrmResult};
use crate::qb::result_field;
use crate::row_data::RowData;
use crate::value::Value;
use tokio_postgres::Row;
use tokio_postgres::types::FromSql;

/// Trait for converting a database row into a Rust value.
///
/// # Example
///
/// ```ignore
/// use pgcrud::{FromRow, OrmResult, RowExt};
///
/// struct Article {
///     id: i64,
///     title: String,
/// }
///
/// impl FromRow for Article {
///     fn from_row(row: &tokio_postgres::Row) -> OrmResult<Self> {
///         Ok(Self {
///             id: row.try_get_column("id")?,
///             title: row.try_get_column("title")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> OrmResult<Self>;
}

impl FromRow for RowData {
    fn from_row(row: &Row) -> OrmResult<Self> {
        let mut data = RowData::new();
        for (idx, column) in row.columns().iter().enumerate() {
            let value: Value = row
                .try_get(idx)
                .map_err(|e| OrmError::decode(column.name(), e.to_string()))?;
            data.set(column.name(), value);
        }
        Ok(data)
    }
}

/// Map every row with [`FromRow`].
pub fn from_rows<T: FromRow>(rows: &[Row]) -> OrmResult<Vec<T>> {
    rows.iter().map(T::from_row).collect()
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning OrmError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>;

    /// Read a field projected under a registration alias (`alias__field`).
    fn try_get_field<T>(&self, alias: &str, field: &str) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get_column(&result_field(alias, field))
    }

    /// Every column as a [`RowData`].
    fn to_row_data(&self) -> OrmResult<RowData>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| OrmError::decode(column, e.to_string()))
    }

    fn to_row_data(&self) -> OrmResult<RowData> {
        RowData::from_row(self)
    }
}
