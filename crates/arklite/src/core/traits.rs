//! Core traits for the copy pipeline.
//!
//! - [`RowSource`]: reads column metadata and cursor-bounded row batches
//! - [`Dialect`]: identifier and placeholder syntax for one database engine

use async_trait::async_trait;

use crate::error::Result;
use crate::query::SelectQuery;

use super::schema::{ColumnInfo, ProbedColumn};
use super::value::RowTuple;

/// Read table structure and rows from a source database.
///
/// The extraction role owns the source for the whole copy, so
/// implementations never see concurrent calls.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Column names and declared type names of `table`, in ordinal order.
    ///
    /// Must not read any rows.
    async fn probe_columns(&self, table: &str) -> Result<Vec<ProbedColumn>>;

    /// Run one cursor-bounded select and decode every returned row.
    ///
    /// `cursor` binds the statement's single `id > ?` placeholder. Rows are
    /// decoded in `columns` order.
    async fn fetch_rows(
        &self,
        query: &SelectQuery,
        cursor: i64,
        columns: &[ColumnInfo],
    ) -> Result<Vec<RowTuple>>;

    /// Close the connection pool.
    async fn close(&self);
}

/// SQL syntax strategy for different database engines.
pub trait Dialect: Send + Sync {
    /// Quote an identifier (table name, column name, etc.).
    ///
    /// - MySQL: `` `identifier` ``
    /// - SQLite: `identifier`, or `"identifier"` when quoting is required
    fn quote_ident(&self, name: &str) -> String;

    /// Get a parameter placeholder for the given 1-based index.
    fn param_placeholder(&self, index: usize) -> String;
}
