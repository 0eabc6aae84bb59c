//! Row mapping traits and utilities

use crate::error::{StanzaError, StanzaResult};
use tokio_postgres::Row;
use tokio_postgres::types::FromSql;

/// Map a database row to a value.
pub trait FromRow: Sized {
    /// Build `Self` from a row.
    fn from_row(row: &Row) -> StanzaResult<Self>;
}

/// Convenience accessors on [`Row`] with decode errors naming the column.
pub trait RowExt {
    /// Get a column by index, converting failures into [`StanzaError::Decode`].
    fn try_column<'a, T: FromSql<'a>>(&'a self, idx: usize) -> StanzaResult<T>;

    /// Get a column by name, converting failures into [`StanzaError::Decode`].
    fn try_named<'a, T: FromSql<'a>>(&'a self, name: &str) -> StanzaResult<T>;
}

impl RowExt for Row {
    fn try_column<'a, T: FromSql<'a>>(&'a self, idx: usize) -> StanzaResult<T> {
        self.try_get(idx).map_err(|e| {
            let column = self
                .columns()
                .get(idx)
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| idx.to_string());
            StanzaError::decode(column, e.to_string())
        })
    }

    fn try_named<'a, T: FromSql<'a>>(&'a self, name: &str) -> StanzaResult<T> {
        self.try_get(name)
            .map_err(|e| StanzaError::decode(name, e.to_string()))
    }
}
