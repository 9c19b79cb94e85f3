//! In-memory [`RowSource`] for pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::core::schema::{ColumnInfo, ProbedColumn, Schema, SchemaOptions};
use crate::core::traits::RowSource;
use crate::core::value::{RowTuple, SqlValue};
use crate::error::{CopyError, Result};
use crate::query::SelectQuery;

/// Table `t` held in memory. The first column is the id.
///
/// `fetch_rows` answers the cursor select the way MySQL would:
/// rows with `id > cursor`, ascending by id, capped at the query limit.
pub struct MemorySource {
    columns: Vec<ProbedColumn>,
    rows: Vec<RowTuple>,
    fail_on_fetch: Option<usize>,
    probes: AtomicUsize,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new(columns: Vec<(&str, &str)>, rows: Vec<RowTuple>) -> Self {
        Self {
            columns: columns
                .into_iter()
                .map(|(name, ty)| ProbedColumn::new(name, ty))
                .collect(),
            rows,
            fail_on_fetch: None,
            probes: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    /// `t(id BIGINT, name VARCHAR)` with one row per id, in the given order.
    pub fn numbered(ids: &[i64]) -> Self {
        Self::new(
            vec![("id", "BIGINT"), ("name", "VARCHAR")],
            ids.iter()
                .map(|id| vec![SqlValue::I64(*id), SqlValue::Text(format!("row-{}", id))])
                .collect(),
        )
    }

    /// Make the n-th fetch (1-based) fail.
    pub fn fail_on_fetch(mut self, n: usize) -> Self {
        self.fail_on_fetch = Some(n);
        self
    }

    pub async fn schema(&self) -> Schema {
        Schema::read(self, &SchemaOptions::new("t", "id"))
            .await
            .unwrap()
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn id_of(row: &RowTuple) -> i64 {
        // Non-integer ids sort first so the extractor gets to reject them
        row[0].widen_id().unwrap_or(i64::MIN)
    }
}

#[async_trait]
impl RowSource for MemorySource {
    async fn probe_columns(&self, _table: &str) -> Result<Vec<ProbedColumn>> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.columns.clone())
    }

    async fn fetch_rows(
        &self,
        query: &SelectQuery,
        cursor: i64,
        columns: &[ColumnInfo],
    ) -> Result<Vec<RowTuple>> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_fetch == Some(n) {
            return Err(CopyError::source_query("connection reset", "selecting rows"));
        }

        let projection: Vec<usize> = columns
            .iter()
            .map(|c| {
                self.columns
                    .iter()
                    .position(|p| p.name == c.name)
                    .unwrap()
            })
            .collect();

        let mut matching: Vec<&RowTuple> = self
            .rows
            .iter()
            .filter(|r| r[0].widen_id().is_none() || Self::id_of(r) > cursor)
            .collect();
        matching.sort_by_key(|r| Self::id_of(*r));

        Ok(matching
            .into_iter()
            .take(query.limit)
            .map(|row| projection.iter().map(|&i| row[i].clone()).collect())
            .collect())
    }

    async fn close(&self) {}
}
